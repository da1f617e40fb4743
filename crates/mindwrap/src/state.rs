//! Per-instance UI state that outlives a content rebuild: folds by path and the last user
//! position.

use indexmap::IndexMap;
use mindwrap_render::engine::{FoldOverride, ToggleEvent, ZoomEvent};
use mindwrap_render::ZoomTransform;
use rustc_hash::{FxHashMap, FxHashSet};

/// Fold flags and positions keyed by instance handler.
///
/// Handlers are opaque strings (`"{context}.{index}"` for wrap blocks). Nothing here is shared
/// between handlers.
#[derive(Debug, Clone, Default)]
pub struct RenderStateManager {
    folds: FxHashMap<String, IndexMap<String, bool>>,
    positions: FxHashMap<String, ZoomTransform>,
    tracking: FxHashSet<String>,
}

impl RenderStateManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold overrides to apply before a full render. Partial renders (a toggle with an origin
    /// path) already carry the user's intent and get none.
    pub fn before_render(&self, handler: &str, origin_path: Option<&str>) -> Vec<FoldOverride> {
        if origin_path.is_some() {
            return Vec::new();
        }
        self.folds
            .get(handler)
            .map(|folds| {
                folds
                    .iter()
                    .map(|(path, folded)| FoldOverride {
                        path: path.clone(),
                        folded: *folded,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Records the toggled path and, for a recursive toggle, every descendant that carries its
    /// own fold annotation.
    pub fn on_toggle(&mut self, handler: &str, event: &ToggleEvent) {
        let folded = !event.expand;
        let folds = self.folds.entry(handler.to_string()).or_default();
        for path in std::iter::once(&event.path).chain(&event.annotated_descendants) {
            folds.insert(path.clone(), folded);
            tracing::trace!(handler, path = %path, folded, "fold recorded");
        }
    }

    /// Records a user-driven position once tracking is enabled. Returns whether it was stored.
    pub fn on_pan(&mut self, handler: &str, event: &ZoomEvent) -> bool {
        if !self.tracking.contains(handler) || !event.cause.is_user_driven() {
            return false;
        }
        self.positions.insert(handler.to_string(), event.transform);
        true
    }

    pub fn enable_tracking(&mut self, handler: &str) {
        self.tracking.insert(handler.to_string());
    }

    pub fn is_tracking(&self, handler: &str) -> bool {
        self.tracking.contains(handler)
    }

    pub fn last_position(&self, handler: &str) -> Option<ZoomTransform> {
        self.positions.get(handler).copied()
    }

    /// Recorded fold of `path`, if the user ever toggled it.
    pub fn is_folded(&self, handler: &str, path: &str) -> Option<bool> {
        self.folds.get(handler)?.get(path).copied()
    }

    pub fn reset(&mut self, handler: &str) {
        self.folds.remove(handler);
        self.positions.remove(handler);
        self.tracking.remove(handler);
    }

    /// Forgets every handler that belongs to `context` (`"{context}.{index}"`).
    pub fn reset_context(&mut self, context: &str) {
        let prefix = format!("{context}.");
        let owned = |handler: &String| handler.starts_with(&prefix);
        self.folds.retain(|h, _| !owned(h));
        self.positions.retain(|h, _| !owned(h));
        self.tracking.retain(|h| !owned(h));
    }

    pub fn clear(&mut self) {
        self.folds.clear();
        self.positions.clear();
        self.tracking.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mindwrap_render::engine::ZoomCause;

    fn toggle(path: &str, expand: bool, annotated: &[&str]) -> ToggleEvent {
        ToggleEvent {
            engine_id: "mm-test-1".into(),
            path: path.into(),
            expand,
            recursive: !annotated.is_empty(),
            annotated_descendants: annotated.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn toggles_become_overrides_for_full_renders_only() {
        let mut state = RenderStateManager::new();
        state.on_toggle("post.0", &toggle("1.3", false, &[]));
        state.on_toggle("post.0", &toggle("1.2", false, &["1.2.5"]));
        state.on_toggle("post.0", &toggle("1.3", true, &[]));

        let overrides = state.before_render("post.0", None);
        assert_eq!(
            overrides,
            vec![
                FoldOverride {
                    path: "1.3".into(),
                    folded: false
                },
                FoldOverride {
                    path: "1.2".into(),
                    folded: true
                },
                FoldOverride {
                    path: "1.2.5".into(),
                    folded: true
                },
            ]
        );
        assert!(state.before_render("post.0", Some("1.3")).is_empty());
        assert!(state.before_render("post.1", None).is_empty());
    }

    #[test]
    fn positions_need_tracking_and_a_user_cause() {
        let mut state = RenderStateManager::new();
        let event = |cause| ZoomEvent {
            transform: ZoomTransform::new(10.0, 20.0, 1.5),
            cause,
        };
        assert!(!state.on_pan("post.0", &event(ZoomCause::Gesture)));

        state.enable_tracking("post.0");
        assert!(!state.on_pan("post.0", &event(ZoomCause::Fit)));
        assert!(!state.on_pan("post.0", &event(ZoomCause::EnsureView)));
        assert!(state.on_pan("post.0", &event(ZoomCause::Gesture)));
        assert_eq!(
            state.last_position("post.0"),
            Some(ZoomTransform::new(10.0, 20.0, 1.5))
        );
    }

    #[test]
    fn reset_forgets_one_handler() {
        let mut state = RenderStateManager::new();
        let pan = ZoomEvent {
            transform: ZoomTransform::new(4.0, 8.0, 2.0),
            cause: ZoomCause::Gesture,
        };
        for handler in ["post.0", "post.1"] {
            state.on_toggle(handler, &toggle("1.2", false, &[]));
            state.enable_tracking(handler);
            assert!(state.on_pan(handler, &pan));
        }

        state.reset("post.0");
        assert_eq!(state.is_folded("post.0", "1.2"), None);
        assert_eq!(state.last_position("post.0"), None);
        assert!(!state.is_tracking("post.0"));
        assert!(state.before_render("post.0", None).is_empty());

        assert_eq!(state.is_folded("post.1", "1.2"), Some(true));
        assert_eq!(state.last_position("post.1"), Some(pan.transform));
        assert!(state.is_tracking("post.1"));
    }

    #[test]
    fn reset_context_only_touches_its_handlers() {
        let mut state = RenderStateManager::new();
        state.on_toggle("post.0", &toggle("1.2", false, &[]));
        state.on_toggle("post.1", &toggle("1.2", false, &[]));
        state.on_toggle("postscript.0", &toggle("1.2", false, &[]));
        state.enable_tracking("post.1");

        state.reset_context("post");
        assert_eq!(state.is_folded("post.0", "1.2"), None);
        assert!(!state.is_tracking("post.1"));
        assert_eq!(state.is_folded("postscript.0", "1.2"), Some(true));
    }
}
