//! The stateful layout engine behind one drawing surface.
//!
//! [`LayoutEngine::set_data`] prepares the tree (ids, paths, folds, measurement, keys) and
//! renders it. Toggles, fits and pans reuse the prepared tree; only new data or a refresh
//! measures again.

use crate::color::ColorAssigner;
use crate::flextree::FlexTree;
use crate::geom::{Size, size};
use crate::hooks::Hook;
use crate::images::{SharedImageCache, apply_image_sizes};
use crate::measure::{DeterministicMeasurer, NodeMeasurer, measure_node};
use crate::model::{
    Bounds, NodeCircle, NodeForeignObject, NodeLine, NodeState, PositionedLink, PositionedNode,
    RenderFrame, link_horizontal,
};
use crate::options::ViewOptions;
use crate::reconcile::{Anchor, reconcile};
use crate::viewport::{
    GestureInput, Padding, WheelEvent, ZoomTransform, ensure_view_delta, fit_transform,
    rescale_transform, wheel_pan, zoom_filter,
};
use crate::{Error, Result};
use mindwrap_core::{Fold, MindmapOptions, Payload, PayloadNode};
use rustc_hash::{FxHashMap, FxHasher};
use serde::{Deserialize, Serialize};
use std::hash::Hasher;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

pub const CIRCLE_OPEN_FILL: &str = "var(--markmap-circle-open-bg)";
const CIRCLE_RADIUS: f64 = 6.0;
const DEFAULT_VIEWPORT: (f64, f64) = (800.0, 500.0);

static NEXT_ENGINE: AtomicU64 = AtomicU64::new(1);

fn next_engine_id() -> String {
    let uuid = uuid::Uuid::new_v4().simple().to_string();
    let seq = NEXT_ENGINE.fetch_add(1, Ordering::Relaxed);
    format!("mm-{}-{seq}", &uuid[..6])
}

/// Reconciliation key: the node path plus a hash of its rendered content.
pub fn content_key(path: &str, content: &str) -> String {
    let mut hasher = FxHasher::default();
    hasher.write(content.as_bytes());
    format!("{path}#{:016x}", hasher.finish())
}

fn link_width(depth: usize) -> f64 {
    (4.0 - 2.0 * depth as f64).max(1.5)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoldOverride {
    pub path: String,
    pub folded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeforeRenderEvent {
    pub engine_id: String,
    /// `None` for full renders, the toggled path for partial ones.
    pub origin_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AfterRenderEvent {
    pub engine_id: String,
    pub origin_path: Option<String>,
    pub nodes: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleEvent {
    pub engine_id: String,
    pub path: String,
    pub expand: bool,
    pub recursive: bool,
    /// Strict descendants whose payload carries an explicit fold annotation; empty unless
    /// `recursive`.
    pub annotated_descendants: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ZoomCause {
    Gesture,
    Rescale,
    EnsureView,
    Fit,
}

impl ZoomCause {
    /// Whether the change came from the user rather than from the engine itself.
    pub fn is_user_driven(self) -> bool {
        matches!(self, Self::Gesture | Self::Rescale)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomEvent {
    pub transform: ZoomTransform,
    pub cause: ZoomCause,
}

/// Listener lists exposed by every engine. Listeners of `before_render` may return fold
/// overrides, which are applied before layout.
#[derive(Debug, Clone, Default)]
pub struct EngineHooks {
    pub before_render: Hook<BeforeRenderEvent, Vec<FoldOverride>>,
    pub after_render: Hook<AfterRenderEvent>,
    pub toggle_node: Hook<ToggleEvent>,
    pub on_zoom: Hook<ZoomEvent>,
}

#[derive(Debug, Clone)]
struct ArenaNode {
    content: String,
    payload: Payload,
    fold: Fold,
    children: Vec<usize>,
    state: NodeState,
}

pub struct LayoutEngine {
    id: String,
    raw_options: MindmapOptions,
    options: ViewOptions,
    measurer: Arc<dyn NodeMeasurer + Send + Sync>,
    images: Option<SharedImageCache>,
    data: Option<PayloadNode>,
    arena: Vec<ArenaNode>,
    by_path: FxHashMap<String, usize>,
    toggled: FxHashMap<String, Fold>,
    colors: ColorAssigner,
    viewport: Size,
    transform: ZoomTransform,
    bounds: Bounds,
    frame: Option<RenderFrame>,
    pending_images: Vec<String>,
    hooks: EngineHooks,
}

impl std::fmt::Debug for LayoutEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayoutEngine")
            .field("id", &self.id)
            .field("nodes", &self.arena.len())
            .field("transform", &self.transform)
            .finish_non_exhaustive()
    }
}

impl Default for LayoutEngine {
    fn default() -> Self {
        Self::new(&MindmapOptions::default())
    }
}

impl LayoutEngine {
    pub fn new(options: &MindmapOptions) -> Self {
        let view = ViewOptions::resolve(options);
        Self {
            id: next_engine_id(),
            raw_options: options.clone(),
            colors: ColorAssigner::new(view.color.clone(), view.color_freeze_level),
            viewport: size(DEFAULT_VIEWPORT.0, view.height.unwrap_or(DEFAULT_VIEWPORT.1)),
            options: view,
            measurer: Arc::new(DeterministicMeasurer::default()),
            images: None,
            data: None,
            arena: Vec::new(),
            by_path: FxHashMap::default(),
            toggled: FxHashMap::default(),
            transform: ZoomTransform::IDENTITY,
            bounds: Bounds::default(),
            frame: None,
            pending_images: Vec::new(),
            hooks: EngineHooks::default(),
        }
    }

    pub fn with_measurer(mut self, measurer: Arc<dyn NodeMeasurer + Send + Sync>) -> Self {
        self.measurer = measurer;
        self
    }

    pub fn with_image_cache(mut self, cache: SharedImageCache) -> Self {
        self.images = Some(cache);
        self
    }

    pub fn with_viewport(mut self, viewport: Size) -> Self {
        self.viewport = viewport;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn hooks(&self) -> &EngineHooks {
        &self.hooks
    }

    pub fn options(&self) -> &ViewOptions {
        &self.options
    }

    pub fn raw_options(&self) -> &MindmapOptions {
        &self.raw_options
    }

    pub fn data(&self) -> Option<&PayloadNode> {
        self.data.as_ref()
    }

    pub fn frame(&self) -> Option<&RenderFrame> {
        self.frame.as_ref()
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn transform(&self) -> ZoomTransform {
        self.transform
    }

    pub fn viewport(&self) -> Size {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Size) {
        self.viewport = viewport;
    }

    pub fn node_state(&self, path: &str) -> Option<&NodeState> {
        self.by_path.get(path).map(|&i| &self.arena[i].state)
    }

    /// Effective fold of `path`, or `None` when the path does not exist.
    pub fn is_folded(&self, path: &str) -> Option<bool> {
        self.by_path
            .get(path)
            .map(|&i| self.arena[i].fold.is_folded())
    }

    /// Image sources discovered as unknown since the last call.
    pub fn take_pending_images(&mut self) -> Vec<String> {
        std::mem::take(&mut self.pending_images)
    }

    /// Overlays `options` on the current ones.
    pub fn set_options(&mut self, options: &MindmapOptions) {
        self.raw_options.overlay(options);
        self.options = ViewOptions::resolve(&self.raw_options);
        if !self
            .colors
            .matches(&self.options.color, self.options.color_freeze_level)
        {
            self.colors =
                ColorAssigner::new(self.options.color.clone(), self.options.color_freeze_level);
        }
    }

    /// Replaces the data (when given), prepares it and renders it. Without data this re-prepares
    /// the current tree, keeping toggled folds.
    pub fn set_data(
        &mut self,
        data: Option<PayloadNode>,
        options: Option<&MindmapOptions>,
    ) -> Result<()> {
        if let Some(options) = options {
            self.set_options(options);
        }
        if let Some(data) = data {
            self.data = Some(data);
            self.toggled.clear();
        }
        if self.data.is_none() {
            return Ok(());
        }
        self.initialize();
        self.render_data(None)?;
        Ok(())
    }

    /// Re-prepares and re-renders the current data.
    pub fn refresh(&mut self) -> Result<()> {
        self.set_data(None, None)
    }

    fn initialize(&mut self) {
        let previous: FxHashMap<String, (Option<f64>, Option<f64>)> = self
            .arena
            .iter()
            .map(|n| (n.state.path.clone(), (n.state.x0, n.state.y0)))
            .collect();
        self.arena.clear();
        self.by_path.clear();

        let Some(data) = self.data.take() else {
            return;
        };
        self.push_node(&data, None, 1, 0, &previous);
        self.data = Some(data);

        let max_width = self.options.max_width;
        let node_min_height = self.options.node_min_height;
        for node in &mut self.arena {
            if let Some(cache) = &self.images {
                let (html, pending) = apply_image_sizes(&node.content, &mut cache.borrow_mut());
                node.content = html;
                self.pending_images.extend(pending);
            }
            node.state.size = measure_node(
                self.measurer.as_ref(),
                &node.content,
                max_width,
                node_min_height,
            );
            node.state.key = content_key(&node.state.path, &node.content);
        }
        tracing::trace!(engine = %self.id, nodes = self.arena.len(), "tree prepared");
    }

    fn push_node(
        &mut self,
        node: &PayloadNode,
        parent: Option<usize>,
        depth: usize,
        recursive_scopes: usize,
        previous: &FxHashMap<String, (Option<f64>, Option<f64>)>,
    ) -> usize {
        let idx = self.arena.len();
        let id = idx + 1;
        let path = match parent {
            Some(p) => format!("{}.{id}", self.arena[p].state.path),
            None => id.to_string(),
        };
        self.colors.color(&path);

        let authored = node.payload.fold();
        let recursive = authored == Fold::CollapsedRecursively;
        let expand_level = self.options.initial_expand_level;
        let fold = if recursive {
            authored
        } else if recursive_scopes > 0 || (expand_level >= 0 && depth as i64 >= expand_level) {
            Fold::Collapsed
        } else {
            authored
        };
        let fold = self.toggled.get(&path).copied().unwrap_or(fold);
        let (x0, y0) = previous.get(&path).copied().unwrap_or((None, None));

        self.by_path.insert(path.clone(), idx);
        self.arena.push(ArenaNode {
            content: node.content.clone(),
            payload: node.payload.clone(),
            fold,
            children: Vec::with_capacity(node.children.len()),
            state: NodeState {
                depth,
                id,
                path,
                size: [0.0, 0.0],
                key: String::new(),
                x0,
                y0,
            },
        });

        let scopes = recursive_scopes + usize::from(recursive);
        for child in &node.children {
            let child_idx = self.push_node(child, Some(idx), depth + 1, scopes, previous);
            self.arena[idx].children.push(child_idx);
        }
        idx
    }

    fn subtree(&self, idx: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack = vec![idx];
        while let Some(i) = stack.pop() {
            out.push(i);
            stack.extend(self.arena[i].children.iter().rev().copied());
        }
        out
    }

    /// Flips the fold of `path` (and, with `recursive`, sets its whole subtree to the same
    /// value), then re-renders with `path` as the origin. Content is not measured again.
    pub fn toggle_node(&mut self, path: &str, recursive: bool) -> Result<()> {
        let idx = *self.by_path.get(path).ok_or_else(|| Error::UnknownPath {
            path: path.to_string(),
        })?;
        let fold = if self.arena[idx].fold.is_folded() {
            Fold::Expanded
        } else {
            Fold::Collapsed
        };
        let targets = if recursive {
            self.subtree(idx)
        } else {
            vec![idx]
        };
        for &t in &targets {
            self.arena[t].fold = fold;
            self.toggled.insert(self.arena[t].state.path.clone(), fold);
        }
        let annotated_descendants = if recursive {
            targets
                .iter()
                .skip(1)
                .filter(|&&t| self.arena[t].payload.fold.is_some())
                .map(|&t| self.arena[t].state.path.clone())
                .collect()
        } else {
            Vec::new()
        };

        self.hooks.toggle_node.call(&ToggleEvent {
            engine_id: self.id.clone(),
            path: path.to_string(),
            expand: !fold.is_folded(),
            recursive,
            annotated_descendants,
        });
        self.render_data(Some(path))?;
        Ok(())
    }

    /// Lays out the visible tree and reconciles it against the previous frame. `None` when
    /// there is no data yet.
    pub fn render_data(&mut self, origin: Option<&str>) -> Result<Option<&RenderFrame>> {
        if self.arena.is_empty() {
            return Ok(None);
        }

        let overrides = self.hooks.before_render.call(&BeforeRenderEvent {
            engine_id: self.id.clone(),
            origin_path: origin.map(str::to_string),
        });
        for FoldOverride { path, folded } in overrides.into_iter().flatten() {
            if let Some(&i) = self.by_path.get(&path) {
                if self.arena[i].fold.is_folded() != folded {
                    self.arena[i].fold = if folded {
                        Fold::Collapsed
                    } else {
                        Fold::Expanded
                    };
                }
            }
        }

        let ViewOptions {
            padding_x,
            spacing_horizontal: sh,
            spacing_vertical: sv,
            ..
        } = self.options;

        let mut tree = FlexTree::new();
        let mut visible: Vec<usize> = Vec::new();
        let mut stack: Vec<(usize, Option<usize>)> = vec![(0, None)];
        while let Some((idx, parent)) = stack.pop() {
            let node = &self.arena[idx];
            let [width, height] = node.state.size;
            let padding = if width != 0.0 { padding_x * 2.0 } else { 0.0 };
            let flex = tree.add_node(parent, height, width + padding + sh);
            visible.push(idx);
            if !node.fold.is_folded() {
                stack.extend(node.children.iter().rev().map(|&c| (c, Some(flex))));
            }
        }
        let parents = tree.parents();
        tree.layout(&|a, b| if parents[a] == parents[b] { sv } else { sv * 2.0 });

        let mut nodes = Vec::with_capacity(visible.len());
        let mut bounds = Bounds {
            min_x: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            min_y: f64::INFINITY,
            max_y: f64::NEG_INFINITY,
        };
        for (flex, &idx) in visible.iter().enumerate() {
            let (x, y) = (tree.x(flex), tree.y(flex));
            let (x_size, y_size) = (tree.x_size(flex), tree.y_size(flex));
            bounds.min_x = bounds.min_x.min(x - x_size / 2.0);
            bounds.max_x = bounds.max_x.max(x + x_size / 2.0);
            bounds.min_y = bounds.min_y.min(y);
            bounds.max_y = bounds.max_y.max(y + y_size - sh);

            let node = &self.arena[idx];
            let color = self.colors.color(&node.state.path);
            let folded = node.fold.is_folded();
            let has_children = !node.children.is_empty();
            nodes.push(PositionedNode {
                key: node.state.key.clone(),
                path: node.state.path.clone(),
                depth: node.state.depth,
                id: node.state.id,
                content: node.content.clone(),
                x,
                y,
                x_size,
                y_size,
                translate: [y, x - x_size / 2.0],
                folded,
                has_children,
                line: NodeLine {
                    x1: -1.0,
                    x2: y_size - sh + 2.0,
                    y1: x_size,
                    y2: x_size,
                    stroke: color.clone(),
                    stroke_width: link_width(node.state.depth),
                },
                circle: has_children.then(|| NodeCircle {
                    cx: y_size - sh,
                    cy: x_size,
                    r: CIRCLE_RADIUS,
                    fill: if folded {
                        color.clone()
                    } else {
                        CIRCLE_OPEN_FILL.to_string()
                    },
                    stroke: color.clone(),
                }),
                foreign_object: NodeForeignObject {
                    x: padding_x,
                    width: (y_size - sh - padding_x * 2.0 + 2.0).max(0.0),
                    height: x_size,
                },
                color,
            });
        }

        let mut links = Vec::with_capacity(visible.len().saturating_sub(1));
        for (flex, target) in nodes.iter().enumerate() {
            let Some(parent) = tree.parent(flex) else {
                continue;
            };
            let source = &nodes[parent];
            let from = [
                source.y + source.y_size - sh,
                source.x + source.x_size / 2.0,
            ];
            let to = [target.y, target.x + target.x_size / 2.0];
            links.push(PositionedLink {
                key: target.key.clone(),
                source_path: source.path.clone(),
                target_path: target.path.clone(),
                depth: target.depth,
                source: from,
                target: to,
                d: link_horizontal(from, to),
                stroke: target.color.clone(),
                stroke_width: link_width(target.depth),
            });
        }

        self.bounds = bounds;
        let fit = self.options.auto_fit;
        if fit {
            self.fit(None);
        }

        let origin_flex = origin
            .and_then(|path| nodes.iter().position(|n| n.path == path))
            .unwrap_or(0);
        let origin_node = &nodes[origin_flex];
        let origin_state = &self.arena[visible[origin_flex]].state;
        let anchor = Anchor {
            x: origin_node.x,
            y: origin_node.y,
            x0: origin_state.x0.unwrap_or(origin_node.x),
            y0: origin_state.y0.unwrap_or(origin_node.y),
            x_size: origin_node.x_size,
            y_size: origin_node.y_size,
        };
        let transitions = reconcile(self.frame.as_ref(), &nodes, &links, &anchor, sh)?;

        for (node, &idx) in nodes.iter().zip(&visible) {
            self.arena[idx].state.x0 = Some(node.x);
            self.arena[idx].state.y0 = Some(node.y);
        }

        let count = nodes.len();
        tracing::debug!(
            engine = %self.id,
            nodes = count,
            origin = origin.unwrap_or("-"),
            "render pass"
        );
        self.frame = Some(RenderFrame {
            nodes,
            links,
            bounds,
            origin_path: origin.map(str::to_string),
            node_transitions: transitions.nodes,
            link_transitions: transitions.links,
            duration: self.options.duration,
            fit,
        });
        self.hooks.after_render.call(&AfterRenderEvent {
            engine_id: self.id.clone(),
            origin_path: origin.map(str::to_string),
            nodes: count,
        });

        Ok(self.frame.as_ref())
    }

    fn set_transform(&mut self, transform: ZoomTransform, cause: ZoomCause) -> ZoomTransform {
        self.transform = transform;
        self.hooks.on_zoom.call(&ZoomEvent { transform, cause });
        transform
    }

    /// Applies `target` when given, otherwise fits the current bounds into the viewport.
    pub fn fit(&mut self, target: Option<ZoomTransform>) -> ZoomTransform {
        let transform = target.unwrap_or_else(|| {
            fit_transform(&self.bounds, self.viewport, self.options.fit_ratio)
        });
        self.set_transform(transform, ZoomCause::Fit)
    }

    /// Pans so that the rendered node at `path` is fully visible. `None` when the node is not
    /// rendered or already visible.
    pub fn ensure_view(&mut self, path: &str, padding: Padding) -> Option<ZoomTransform> {
        let node = self.frame.as_ref()?.node(path)?;
        let (dx, dy) = ensure_view_delta(
            node,
            self.options.spacing_horizontal,
            self.transform,
            self.viewport,
            padding,
        )?;
        let transform = self.transform.translate(dx, dy);
        Some(self.set_transform(transform, ZoomCause::EnsureView))
    }

    /// Zooms by `factor` around the viewport center.
    pub fn rescale(&mut self, factor: f64) -> ZoomTransform {
        let transform = rescale_transform(self.transform, self.viewport, factor);
        self.set_transform(transform, ZoomCause::Rescale)
    }

    /// Routes a wheel event: zoom when the zoom filter accepts it, pan otherwise.
    pub fn handle_wheel(&mut self, event: &WheelEvent) -> Option<ZoomTransform> {
        let wheel = GestureInput::wheel(event.ctrl);
        if self.options.zoom && zoom_filter(&wheel, self.options.scroll_for_pan) {
            let scale = if event.ctrl { 10.0 } else { 1.0 };
            let factor = 2f64.powf(-event.delta_y * 0.002 * scale);
            let transform = rescale_transform(self.transform, self.viewport, factor);
            return Some(self.set_transform(transform, ZoomCause::Gesture));
        }
        if self.options.pan {
            let transform = wheel_pan(self.transform, event);
            return Some(self.set_transform(transform, ZoomCause::Gesture));
        }
        None
    }

    /// Accepts a transform produced by a drag, pinch or double-click when zooming is enabled and
    /// the gesture passes the zoom filter.
    pub fn handle_zoom_gesture(
        &mut self,
        input: &GestureInput,
        target: ZoomTransform,
    ) -> Option<ZoomTransform> {
        if !self.options.zoom || !zoom_filter(input, self.options.scroll_for_pan) {
            return None;
        }
        Some(self.set_transform(target, ZoomCause::Gesture))
    }
}
