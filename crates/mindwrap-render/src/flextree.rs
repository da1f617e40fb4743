//! Non-layered tidy tree layout (van der Ploeg, "Drawing non-layered tidy trees in linear time").
//!
//! Axes follow the mindmap convention: `x` is the sibling axis and `y` the depth axis. Each node
//! has an `x_size` (its extent along siblings) and a `y_size` (its extent along depth); a child
//! starts where its parent's `y_size` ends. After [`FlexTree::layout`], `x` is the node center and
//! the root is centered on `x = 0`.

#[derive(Debug, Clone, Default)]
struct FlexNode {
    parent: Option<usize>,
    children: Vec<usize>,
    w: f64,
    h: f64,
    x: f64,
    y: f64,
    prelim: f64,
    modifier: f64,
    shift: f64,
    change: f64,
    thread_left: Option<usize>,
    thread_right: Option<usize>,
    extreme_left: usize,
    extreme_right: usize,
    mod_sum_left: f64,
    mod_sum_right: f64,
}

/// Lowest y-coordinate of the contour seen so far, per sibling index.
#[derive(Debug, Clone, Copy)]
struct Iyl {
    low_y: f64,
    index: usize,
}

fn update_iyl(stack: &mut Vec<Iyl>, min_y: f64, index: usize) {
    while stack.last().is_some_and(|top| min_y >= top.low_y) {
        stack.pop();
    }
    stack.push(Iyl {
        low_y: min_y,
        index,
    });
}

#[derive(Debug, Clone, Default)]
pub struct FlexTree {
    nodes: Vec<FlexNode>,
}

impl FlexTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Adds a node. Node `0` is the root; every later node must name an existing parent.
    pub fn add_node(&mut self, parent: Option<usize>, x_size: f64, y_size: f64) -> usize {
        let idx = self.nodes.len();
        self.nodes.push(FlexNode {
            parent,
            w: x_size,
            h: y_size,
            extreme_left: idx,
            extreme_right: idx,
            ..FlexNode::default()
        });
        if let Some(p) = parent {
            self.nodes[p].children.push(idx);
        }
        idx
    }

    pub fn parent(&self, idx: usize) -> Option<usize> {
        self.nodes[idx].parent
    }

    pub fn parents(&self) -> Vec<Option<usize>> {
        self.nodes.iter().map(|n| n.parent).collect()
    }

    /// Center on the sibling axis.
    pub fn x(&self, idx: usize) -> f64 {
        self.nodes[idx].x
    }

    /// Start on the depth axis.
    pub fn y(&self, idx: usize) -> f64 {
        self.nodes[idx].y
    }

    pub fn x_size(&self, idx: usize) -> f64 {
        self.nodes[idx].w
    }

    pub fn y_size(&self, idx: usize) -> f64 {
        self.nodes[idx].h
    }

    /// Lays the tree out. `spacing(a, b)` is the extra gap required between adjacent contour
    /// nodes `a` (left) and `b` (right).
    pub fn layout(&mut self, spacing: &dyn Fn(usize, usize) -> f64) {
        if self.nodes.is_empty() {
            return;
        }
        for idx in 0..self.nodes.len() {
            let y = match self.nodes[idx].parent {
                Some(p) => self.nodes[p].y + self.nodes[p].h,
                None => 0.0,
            };
            self.nodes[idx].y = y;
        }
        self.first_walk(0, spacing);
        self.second_walk(0, 0.0);

        let offset = self.nodes[0].x + self.nodes[0].w / 2.0;
        for node in &mut self.nodes {
            node.x += node.w / 2.0 - offset;
        }
    }

    fn bottom(&self, idx: usize) -> f64 {
        self.nodes[idx].y + self.nodes[idx].h
    }

    fn first_walk(&mut self, t: usize, spacing: &dyn Fn(usize, usize) -> f64) {
        let children = self.nodes[t].children.clone();
        let Some(&first) = children.first() else {
            self.set_extremes(t);
            return;
        };
        self.first_walk(first, spacing);
        let mut ih = Vec::new();
        update_iyl(&mut ih, self.bottom(self.nodes[first].extreme_left), 0);
        for i in 1..children.len() {
            self.first_walk(children[i], spacing);
            let min_y = self.bottom(self.nodes[children[i]].extreme_right);
            self.separate(t, i, &ih, spacing);
            update_iyl(&mut ih, min_y, i);
        }
        self.position_root(t);
        self.set_extremes(t);
    }

    fn set_extremes(&mut self, t: usize) {
        let children = &self.nodes[t].children;
        match (children.first().copied(), children.last().copied()) {
            (Some(first), Some(last)) => {
                let (el, msel) = (
                    self.nodes[first].extreme_left,
                    self.nodes[first].mod_sum_left,
                );
                let (er, mser) = (
                    self.nodes[last].extreme_right,
                    self.nodes[last].mod_sum_right,
                );
                let node = &mut self.nodes[t];
                node.extreme_left = el;
                node.mod_sum_left = msel;
                node.extreme_right = er;
                node.mod_sum_right = mser;
            }
            _ => {
                let node = &mut self.nodes[t];
                node.extreme_left = t;
                node.extreme_right = t;
                node.mod_sum_left = 0.0;
                node.mod_sum_right = 0.0;
            }
        }
    }

    fn next_left_contour(&self, idx: usize) -> Option<usize> {
        let node = &self.nodes[idx];
        node.children.first().copied().or(node.thread_left)
    }

    fn next_right_contour(&self, idx: usize) -> Option<usize> {
        let node = &self.nodes[idx];
        node.children.last().copied().or(node.thread_right)
    }

    fn separate(
        &mut self,
        t: usize,
        i: usize,
        ih: &[Iyl],
        spacing: &dyn Fn(usize, usize) -> f64,
    ) {
        let left_sibling = self.nodes[t].children[i - 1];
        let current = self.nodes[t].children[i];
        let mut sr = Some(left_sibling);
        let mut mssr = self.nodes[left_sibling].modifier;
        let mut cl = Some(current);
        let mut mscl = self.nodes[current].modifier;
        let mut cursor = ih.len().saturating_sub(1);

        while let (Some(s), Some(c)) = (sr, cl) {
            if cursor > 0 && self.bottom(s) > ih[cursor].low_y {
                cursor -= 1;
            }
            let dist = (mssr + self.nodes[s].prelim + self.nodes[s].w + spacing(s, c))
                - (mscl + self.nodes[c].prelim);
            if dist > 0.0 {
                mscl += dist;
                self.move_subtree(t, i, ih[cursor].index, dist);
            }
            let sy = self.bottom(s);
            let cy = self.bottom(c);
            if sy <= cy {
                sr = self.next_right_contour(s);
                if let Some(next) = sr {
                    mssr += self.nodes[next].modifier;
                }
            }
            if sy >= cy {
                cl = self.next_left_contour(c);
                if let Some(next) = cl {
                    mscl += self.nodes[next].modifier;
                }
            }
        }

        match (sr, cl) {
            (None, Some(c)) => self.set_left_thread(t, i, c, mscl),
            (Some(s), None) => self.set_right_thread(t, i, s, mssr),
            _ => {}
        }
    }

    fn move_subtree(&mut self, t: usize, i: usize, si: usize, dist: f64) {
        let child = self.nodes[t].children[i];
        let node = &mut self.nodes[child];
        node.modifier += dist;
        node.mod_sum_left += dist;
        node.mod_sum_right += dist;
        self.distribute_extra(t, i, si, dist);
    }

    fn distribute_extra(&mut self, t: usize, i: usize, si: usize, dist: f64) {
        if si + 1 == i {
            return;
        }
        let nr = (i - si) as f64;
        let after = self.nodes[t].children[si + 1];
        let current = self.nodes[t].children[i];
        self.nodes[after].shift += dist / nr;
        self.nodes[current].shift -= dist / nr;
        self.nodes[current].change -= dist - dist / nr;
    }

    fn set_left_thread(&mut self, t: usize, i: usize, cl: usize, mod_sum_cl: f64) {
        let first = self.nodes[t].children[0];
        let current = self.nodes[t].children[i];
        let li = self.nodes[first].extreme_left;
        self.nodes[li].thread_left = Some(cl);
        let diff = (mod_sum_cl - self.nodes[cl].modifier) - self.nodes[first].mod_sum_left;
        self.nodes[li].modifier += diff;
        self.nodes[li].prelim -= diff;
        self.nodes[first].extreme_left = self.nodes[current].extreme_left;
        self.nodes[first].mod_sum_left = self.nodes[current].mod_sum_left;
    }

    fn set_right_thread(&mut self, t: usize, i: usize, sr: usize, mod_sum_sr: f64) {
        let previous = self.nodes[t].children[i - 1];
        let current = self.nodes[t].children[i];
        let ri = self.nodes[current].extreme_right;
        self.nodes[ri].thread_right = Some(sr);
        let diff = (mod_sum_sr - self.nodes[sr].modifier) - self.nodes[current].mod_sum_right;
        self.nodes[ri].modifier += diff;
        self.nodes[ri].prelim -= diff;
        self.nodes[current].extreme_right = self.nodes[previous].extreme_right;
        self.nodes[current].mod_sum_right = self.nodes[previous].mod_sum_right;
    }

    fn position_root(&mut self, t: usize) {
        let children = &self.nodes[t].children;
        let (Some(&first), Some(&last)) = (children.first(), children.last()) else {
            return;
        };
        let first = &self.nodes[first];
        let last = &self.nodes[last];
        let prelim = (first.prelim + first.modifier + last.modifier + last.prelim + last.w) / 2.0
            - self.nodes[t].w / 2.0;
        self.nodes[t].prelim = prelim;
    }

    fn second_walk(&mut self, t: usize, mod_sum: f64) {
        let mod_sum = mod_sum + self.nodes[t].modifier;
        self.nodes[t].x = self.nodes[t].prelim + mod_sum;
        self.add_child_spacing(t);
        let children = self.nodes[t].children.clone();
        for child in children {
            self.second_walk(child, mod_sum);
        }
    }

    fn add_child_spacing(&mut self, t: usize) {
        let mut d = 0.0;
        let mut mod_sum_delta = 0.0;
        let children = self.nodes[t].children.clone();
        for child in children {
            let node = &mut self.nodes[child];
            d += node.shift;
            mod_sum_delta += d + node.change;
            node.modifier += mod_sum_delta;
        }
    }
}
