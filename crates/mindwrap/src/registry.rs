//! Instances per editing session.
//!
//! The registry owns one [`LayoutEngine`] per wrap block (handler `"{context}.{index}"`), wires
//! its hooks into the shared [`RenderStateManager`], and drives the time-based parts (tracking
//! start, debounced refreshes) off explicit `Instant` ticks.

use crate::render::Result;
use crate::schedule::{Debouncer, Task, TimerQueue};
use crate::state::RenderStateManager;
use indexmap::IndexMap;
use mindwrap_core::{
    DeriveFlags, MindmapOptions, Transformer, WrapBlock, derive_options, find_wrap_blocks,
};
use mindwrap_render::geom::{Size, size};
use mindwrap_render::model::RenderFrame;
use mindwrap_render::{
    DeterministicMeasurer, GestureInput, HookToken, ImageCache, LayoutEngine, NodeMeasurer,
    Padding, RefreshHub, SharedImageCache, ViewOptions, WheelEvent, ZoomTransform,
};
use rustc_hash::{FxHashMap, FxHashSet};
use std::cell::{Ref, RefCell};
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const ZOOM_IN_FACTOR: f64 = 1.25;
pub const ZOOM_OUT_FACTOR: f64 = 0.8;

struct Instance {
    engine: Rc<RefCell<LayoutEngine>>,
    /// Released on teardown; dropping them unsubscribes.
    _tokens: Vec<HookToken>,
    wrap: Option<WrapBlock>,
}

pub struct InstanceRegistry {
    instances: IndexMap<String, Instance>,
    render_counts: FxHashMap<String, usize>,
    fitted_heights: FxHashMap<String, f64>,
    previous_in_preview: FxHashSet<String>,
    state: Rc<RefCell<RenderStateManager>>,
    transformer: Transformer,
    images: SharedImageCache,
    image_requests: Vec<String>,
    hub: RefreshHub,
    refresh: Debouncer,
    timers: TimerQueue,
    measurer: Arc<dyn NodeMeasurer + Send + Sync>,
    viewport: Size,
    active_context: Option<String>,
}

impl std::fmt::Debug for InstanceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceRegistry")
            .field("instances", &self.instances.keys().collect::<Vec<_>>())
            .field("active_context", &self.active_context)
            .finish_non_exhaustive()
    }
}

impl Default for InstanceRegistry {
    fn default() -> Self {
        Self {
            instances: IndexMap::new(),
            render_counts: FxHashMap::default(),
            fitted_heights: FxHashMap::default(),
            previous_in_preview: FxHashSet::default(),
            state: Rc::new(RefCell::new(RenderStateManager::new())),
            transformer: Transformer::default(),
            images: ImageCache::shared(),
            image_requests: Vec::new(),
            hub: RefreshHub::new(),
            refresh: Debouncer::default(),
            timers: TimerQueue::new(),
            measurer: Arc::new(DeterministicMeasurer::default()),
            viewport: size(800.0, 500.0),
            active_context: None,
        }
    }
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_measurer(mut self, measurer: Arc<dyn NodeMeasurer + Send + Sync>) -> Self {
        self.measurer = measurer;
        self
    }

    pub fn with_transformer(mut self, transformer: Transformer) -> Self {
        self.transformer = transformer;
        self
    }

    /// Default surface size; an instance's `height` option overrides the height.
    pub fn with_viewport(mut self, viewport: Size) -> Self {
        self.viewport = viewport;
        self
    }

    pub fn state(&self) -> Ref<'_, RenderStateManager> {
        self.state.borrow()
    }

    pub fn images(&self) -> &SharedImageCache {
        &self.images
    }

    pub fn hub(&self) -> &RefreshHub {
        &self.hub
    }

    pub fn handlers(&self) -> impl Iterator<Item = &str> {
        self.instances.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn lookup(&self, handler: &str) -> Option<Rc<RefCell<LayoutEngine>>> {
        self.instances.get(handler).map(|i| Rc::clone(&i.engine))
    }

    pub fn frame(&self, handler: &str) -> Option<RenderFrame> {
        let instance = self.instances.get(handler)?;
        instance.engine.borrow().frame().cloned()
    }

    pub fn is_folded(&self, handler: &str, path: &str) -> Option<bool> {
        self.instances.get(handler)?.engine.borrow().is_folded(path)
    }

    /// Creates a fresh instance for `handler`, replacing any previous one, and subscribes it to
    /// the fold/position bookkeeping and the refresh hub.
    pub fn create(&mut self, handler: &str, options: &MindmapOptions) -> Rc<RefCell<LayoutEngine>> {
        self.teardown(handler);

        let height = ViewOptions::resolve(options)
            .height
            .unwrap_or(self.viewport.height);
        let engine = LayoutEngine::new(options)
            .with_measurer(Arc::clone(&self.measurer))
            .with_image_cache(Rc::clone(&self.images))
            .with_viewport(size(self.viewport.width, height));
        let hooks = engine.hooks().clone();
        let engine = Rc::new(RefCell::new(engine));

        let mut tokens = Vec::with_capacity(4);
        let state = Rc::clone(&self.state);
        let owner = handler.to_string();
        tokens.push(hooks.before_render.tap(move |event| {
            state
                .try_borrow()
                .map(|s| s.before_render(&owner, event.origin_path.as_deref()))
                .unwrap_or_default()
        }));

        let state = Rc::clone(&self.state);
        let owner = handler.to_string();
        tokens.push(hooks.toggle_node.tap(move |event| {
            if let Ok(mut state) = state.try_borrow_mut() {
                state.on_toggle(&owner, event);
            }
        }));

        let state = Rc::clone(&self.state);
        let owner = handler.to_string();
        tokens.push(hooks.on_zoom.tap(move |event| {
            if let Ok(mut state) = state.try_borrow_mut() {
                state.on_pan(&owner, event);
            }
        }));

        let weak = Rc::downgrade(&engine);
        let owner = handler.to_string();
        tokens.push(self.hub.tap(move || {
            let Some(engine) = weak.upgrade() else {
                return;
            };
            let Ok(mut engine) = engine.try_borrow_mut() else {
                return;
            };
            if let Err(err) = engine.refresh() {
                tracing::warn!(handler = %owner, error = %err, "refresh failed");
            }
        }));

        tracing::debug!(handler, "instance created");
        self.instances.insert(
            handler.to_string(),
            Instance {
                engine: Rc::clone(&engine),
                _tokens: tokens,
                wrap: None,
            },
        );
        engine
    }

    pub fn track_render_count(&mut self, handler: &str) -> usize {
        let count = self.render_counts.entry(handler.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    pub fn is_first_render(&self, handler: &str) -> bool {
        self.render_counts.get(handler) == Some(&1)
    }

    /// Renders every wrap block of a container into `"{context}.{index}"` instances and returns
    /// their handlers. Instances of the context that no longer have a block are torn down.
    pub fn apply_wraps(
        &mut self,
        container_html: &str,
        context: &str,
        is_preview: bool,
        now: Instant,
    ) -> Result<Vec<String>> {
        let blocks = find_wrap_blocks(container_html);
        if blocks.is_empty() {
            self.teardown_context(context);
            return Ok(Vec::new());
        }

        let mut handlers = Vec::with_capacity(blocks.len());
        for block in blocks {
            handlers.push(self.render_wrap(context, block, is_preview, now)?);
        }

        let prefix = format!("{context}.");
        let stale: Vec<String> = self
            .instances
            .keys()
            .filter(|h| h.starts_with(&prefix) && !handlers.contains(h))
            .cloned()
            .collect();
        for handler in stale {
            self.teardown(&handler);
        }
        Ok(handlers)
    }

    /// Renders one wrap block. Preview re-renders reuse the existing instance; every render after
    /// the first runs without transitions.
    pub fn render_wrap(
        &mut self,
        context: &str,
        block: WrapBlock,
        is_preview: bool,
        now: Instant,
    ) -> Result<String> {
        let handler = format!("{context}.{}", block.index);
        let options = derive_options(&block.attributes, DeriveFlags::default());
        self.track_render_count(&handler);

        let reused = if self.previous_in_preview.contains(&handler) {
            self.lookup(&handler)
        } else {
            None
        };
        let engine = match reused {
            Some(engine) => engine,
            None => self.create(&handler, &options),
        };

        if !self.state.borrow().is_tracking(&handler) {
            let delay = ViewOptions::resolve(&options).duration;
            match Duration::try_from_secs_f64(delay / 1000.0)
                .ok()
                .and_then(|delay| now.checked_add(delay))
            {
                Some(at) => self.timers.schedule(
                    at,
                    Task::EnableTracking {
                        handler: handler.clone(),
                    },
                ),
                None => tracing::warn!(handler = %handler, delay, "tracking delay out of range"),
            }
        }

        let data = self.transformer.transform_wrap(&block);
        let last_position = self.state.borrow().last_position(&handler);
        let first = self.is_first_render(&handler);
        {
            let mut engine = engine.borrow_mut();
            let duration = ViewOptions::resolve(&options).duration;
            let render_options = if first {
                options.clone()
            } else {
                MindmapOptions {
                    duration: Some(0.0),
                    ..options.clone()
                }
            };
            engine.set_data(Some(data), Some(&render_options))?;
            engine.fit(last_position);
            if !first {
                engine.set_options(&MindmapOptions {
                    duration: Some(duration),
                    ..MindmapOptions::default()
                });
            }
            self.image_requests.extend(engine.take_pending_images());
        }

        if is_preview {
            self.previous_in_preview.insert(handler.clone());
        }
        if let Some(instance) = self.instances.get_mut(&handler) {
            instance.wrap = Some(block);
        }
        tracing::debug!(handler = %handler, first, is_preview, "wrap rendered");
        Ok(handler)
    }

    /// Rebuilds an instance from its wrap block without transitions and restores the last user
    /// position. `None` for unknown handlers.
    pub fn refresh_transform(&mut self, handler: &str) -> Result<Option<ZoomTransform>> {
        let Some(instance) = self.instances.get(handler) else {
            return Ok(None);
        };
        let Some(block) = instance.wrap.as_ref() else {
            return Ok(None);
        };
        let options = derive_options(&block.attributes, DeriveFlags::default());
        let duration = ViewOptions::resolve(&options).duration;
        let data = self.transformer.transform_wrap(block);
        let last_position = self.state.borrow().last_position(handler);

        let mut engine = instance.engine.borrow_mut();
        engine.set_data(
            Some(data),
            Some(&MindmapOptions {
                duration: Some(0.0),
                ..options
            }),
        )?;
        let transform = engine.fit(last_position);
        engine.set_options(&MindmapOptions {
            duration: Some(duration),
            ..MindmapOptions::default()
        });
        self.image_requests.extend(engine.take_pending_images());
        Ok(Some(transform))
    }

    /// Secondary content (math, diagrams) inside `handler` finished rendering.
    pub fn secondary_content_ready(&mut self, handler: &str) -> Result<Option<ZoomTransform>> {
        tracing::debug!(handler, "secondary content ready");
        self.refresh_transform(handler)
    }

    /// Toggles `path` the way a click does: recursive when the instance's `toggleRecursively`
    /// differs from the modifier key. `false` when the instance is unknown.
    pub fn click_node(&mut self, handler: &str, path: &str, modifier: bool) -> Result<bool> {
        let Some(instance) = self.instances.get(handler) else {
            return Ok(false);
        };
        let mut engine = instance.engine.borrow_mut();
        let recursive = engine.options().toggle_recursively != modifier;
        engine.toggle_node(path, recursive)?;
        Ok(true)
    }

    pub fn toggle_node(&mut self, handler: &str, path: &str, recursive: bool) -> Result<bool> {
        let Some(instance) = self.instances.get(handler) else {
            return Ok(false);
        };
        instance.engine.borrow_mut().toggle_node(path, recursive)?;
        Ok(true)
    }

    pub fn fit(&mut self, handler: &str) -> Option<ZoomTransform> {
        let instance = self.instances.get(handler)?;
        let transform = instance.engine.borrow_mut().fit(None);
        Some(transform)
    }

    pub fn zoom_in(&mut self, handler: &str) -> Option<ZoomTransform> {
        self.rescale(handler, ZOOM_IN_FACTOR)
    }

    pub fn zoom_out(&mut self, handler: &str) -> Option<ZoomTransform> {
        self.rescale(handler, ZOOM_OUT_FACTOR)
    }

    pub fn rescale(&mut self, handler: &str, factor: f64) -> Option<ZoomTransform> {
        let instance = self.instances.get(handler)?;
        let transform = instance.engine.borrow_mut().rescale(factor);
        Some(transform)
    }

    /// Toolbar "recurse" switch. `false` when the instance is unknown.
    pub fn set_toggle_recursively(&mut self, handler: &str, active: bool) -> bool {
        let Some(instance) = self.instances.get(handler) else {
            return false;
        };
        instance.engine.borrow_mut().set_options(&MindmapOptions {
            toggle_recursively: Some(active),
            ..MindmapOptions::default()
        });
        true
    }

    pub fn ensure_view(
        &mut self,
        handler: &str,
        path: &str,
        padding: Padding,
    ) -> Option<ZoomTransform> {
        let instance = self.instances.get(handler)?;
        instance.engine.borrow_mut().ensure_view(path, padding)
    }

    pub fn handle_wheel(&mut self, handler: &str, event: &WheelEvent) -> Option<ZoomTransform> {
        let instance = self.instances.get(handler)?;
        instance.engine.borrow_mut().handle_wheel(event)
    }

    pub fn handle_zoom_gesture(
        &mut self,
        handler: &str,
        input: &GestureInput,
        target: ZoomTransform,
    ) -> Option<ZoomTransform> {
        let instance = self.instances.get(handler)?;
        instance
            .engine
            .borrow_mut()
            .handle_zoom_gesture(input, target)
    }

    /// Shrinks the surface of `handler` to its content when that is shorter than `maxHeight`.
    /// Returns the new height, or `None` when the instance is unknown, has no `maxHeight`, or
    /// its content already needs the full height.
    pub fn auto_fit_height(&mut self, handler: &str) -> Option<f64> {
        let instance = self.instances.get(handler)?;
        let mut engine = instance.engine.borrow_mut();
        let max_height = engine.options().max_height.filter(|h| *h > 0.0)?;
        let fit_ratio = engine.options().fit_ratio;

        let width = engine.viewport().width;
        engine.set_viewport(size(width, max_height));
        let transform = engine.fit(None);
        let content_height = engine.bounds().height() * transform.k / fit_ratio;
        if !content_height.is_finite() || content_height >= max_height {
            return None;
        }

        engine.set_viewport(size(width, content_height));
        engine.fit(None);
        drop(engine);
        self.fitted_heights.insert(handler.to_string(), content_height);
        tracing::debug!(handler, height = content_height, "auto-fit height");
        Some(content_height)
    }

    pub fn auto_fitted_height(&self, handler: &str) -> Option<f64> {
        self.fitted_heights.get(handler).copied()
    }

    /// Records a loaded image size. A size that was unknown schedules a debounced refresh of
    /// every instance.
    pub fn image_loaded(&mut self, src: &str, width: f64, height: f64, now: Instant) -> bool {
        let learned = self.images.borrow_mut().insert(src, width, height);
        if learned {
            self.refresh.call(now);
        }
        learned
    }

    /// Image sources waiting for their natural size.
    pub fn take_image_requests(&mut self) -> Vec<String> {
        std::mem::take(&mut self.image_requests)
    }

    pub fn notify_refresh_all(&self) {
        self.hub.notify_all();
    }

    /// Runs due timers. Returns `true` when a debounced refresh fired.
    pub fn tick(&mut self, now: Instant) -> bool {
        for task in self.timers.due(now) {
            match task {
                Task::EnableTracking { handler } => {
                    if self.instances.contains_key(&handler) {
                        self.state.borrow_mut().enable_tracking(&handler);
                        tracing::trace!(handler = %handler, "position tracking enabled");
                    }
                }
            }
        }
        if !self.refresh.poll(now) {
            return false;
        }
        self.notify_refresh_all();
        for instance in self.instances.values() {
            let pending = instance.engine.borrow_mut().take_pending_images();
            self.image_requests.extend(pending);
        }
        true
    }

    /// Drops one instance and its subscriptions. Recorded folds and positions are kept.
    pub fn teardown(&mut self, handler: &str) -> bool {
        self.timers.cancel_handler(handler);
        self.fitted_heights.remove(handler);
        self.previous_in_preview.remove(handler);
        let removed = self.instances.shift_remove(handler).is_some();
        if removed {
            tracing::debug!(handler, "instance torn down");
        }
        removed
    }

    pub fn teardown_context(&mut self, context: &str) {
        let prefix = format!("{context}.");
        let owned: Vec<String> = self
            .instances
            .keys()
            .filter(|h| h.starts_with(&prefix))
            .cloned()
            .collect();
        for handler in owned {
            self.teardown(&handler);
        }
        self.render_counts.retain(|h, _| !h.starts_with(&prefix));
    }

    /// Switches the editing context. Leaving a context forgets its instances and UI state.
    pub fn begin_context(&mut self, context: &str) {
        if self.active_context.as_deref() == Some(context) {
            return;
        }
        if let Some(previous) = self.active_context.take() {
            self.teardown_context(&previous);
            self.state.borrow_mut().reset_context(&previous);
        }
        self.active_context = Some(context.to_string());
    }

    pub fn clear(&mut self) {
        let handlers: Vec<String> = self.instances.keys().cloned().collect();
        for handler in handlers {
            self.teardown(&handler);
        }
        self.render_counts.clear();
    }
}
