use regex::{Captures, Regex};
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::OnceLock;

/// Natural sizes of external images, keyed by `src`. `[0, 0]` marks a load in flight.
#[derive(Debug, Clone, Default)]
pub struct ImageCache {
    sizes: FxHashMap<String, [f64; 2]>,
}

/// One cache per editing session, shared by every instance in it.
pub type SharedImageCache = Rc<RefCell<ImageCache>>;

impl ImageCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedImageCache {
        Rc::new(RefCell::new(Self::new()))
    }

    /// Known size, or `None` while unknown or pending.
    pub fn get(&self, src: &str) -> Option<[f64; 2]> {
        self.sizes
            .get(src)
            .copied()
            .filter(|[w, h]| *w > 0.0 || *h > 0.0)
    }

    pub fn is_pending(&self, src: &str) -> bool {
        self.sizes.get(src).is_some_and(|[w, h]| *w == 0.0 && *h == 0.0)
    }

    /// Marks `src` as loading. Returns `false` when it is already known or pending.
    pub fn mark_pending(&mut self, src: &str) -> bool {
        if self.sizes.contains_key(src) {
            return false;
        }
        self.sizes.insert(src.to_string(), [0.0, 0.0]);
        true
    }

    /// Records a loaded size. Returns `true` when this turns an unknown entry into a known one.
    pub fn insert(&mut self, src: &str, width: f64, height: f64) -> bool {
        let was_known = self.get(src).is_some();
        self.sizes.insert(src.to_string(), [width, height]);
        if !was_known {
            tracing::debug!(src, width, height, "image size known");
        }
        !was_known
    }

    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }
}

fn img_tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)<img\b([^>]*?)(\s*/?)>").expect("valid regex"))
}

fn src_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)\bsrc\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid regex")
    })
}

fn width_attr_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\swidth\s*=").expect("valid regex"))
}

/// Gives every `<img>` without a `width` attribute the cached size of its `src`.
///
/// Returns the rewritten HTML and the sources that are neither known nor already pending; those
/// are marked pending in `cache`.
pub fn apply_image_sizes(html: &str, cache: &mut ImageCache) -> (String, Vec<String>) {
    let mut pending = Vec::new();
    let out = img_tag_regex().replace_all(html, |caps: &Captures<'_>| {
        let whole = caps[0].to_string();
        let attrs = &caps[1];
        if width_attr_regex().is_match(attrs) {
            return whole;
        }
        let Some(src) = src_regex()
            .captures(attrs)
            .and_then(|c| c.get(1).or_else(|| c.get(2)))
            .map(|m| m.as_str().to_string())
        else {
            return whole;
        };
        match cache.get(&src) {
            Some([w, h]) => format!(r#"<img{attrs} width="{w}" height="{h}"{}>"#, &caps[2]),
            None => {
                if cache.mark_pending(&src) {
                    pending.push(src);
                }
                whole
            }
        }
    });
    (out.into_owned(), pending)
}
