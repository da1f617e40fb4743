#![forbid(unsafe_code)]

//! `mindwrap` turns markup into interactive mindmaps without a browser.
//!
//! The extraction pipeline (`mindwrap-core`) is re-exported at the crate root. With the
//! `render` feature (on by default) the crate also exposes layout ([`render`]) and the session
//! layer that keeps per-instance UI state across content refreshes ([`registry`], [`state`]).
//!
//! # Features
//!
//! - `render`: enable layout, reconciliation and the instance registry

pub use mindwrap_core::*;

pub mod schedule;

#[cfg(feature = "render")]
pub mod registry;
#[cfg(feature = "render")]
pub mod state;

#[cfg(feature = "render")]
pub mod render {
    pub use mindwrap_render::geom::{Size, size};
    pub use mindwrap_render::model::RenderFrame;
    pub use mindwrap_render::{
        DeterministicMeasurer, LayoutEngine, MAX_DURATION, NodeMeasurer, Padding, ViewOptions,
        ZoomTransform,
    };
    use std::sync::Arc;

    #[derive(Debug, thiserror::Error)]
    pub enum HeadlessError {
        #[error(transparent)]
        Parse(#[from] mindwrap_core::Error),
        #[error(transparent)]
        Render(#[from] mindwrap_render::Error),
    }

    pub type Result<T> = std::result::Result<T, HeadlessError>;

    /// First render of a document: the frame plus the transform that fits it.
    #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
    pub struct HeadlessLayout {
        pub frame: RenderFrame,
        pub transform: ZoomTransform,
    }

    /// Bundles a transformer, options and a measurer for one-shot headless layout.
    #[derive(Clone)]
    pub struct HeadlessLayouter {
        pub transformer: mindwrap_core::Transformer,
        pub options: mindwrap_core::MindmapOptions,
        pub viewport: Size,
        pub measurer: Arc<dyn NodeMeasurer + Send + Sync>,
    }

    impl Default for HeadlessLayouter {
        fn default() -> Self {
            Self {
                transformer: mindwrap_core::Transformer::default(),
                options: mindwrap_core::MindmapOptions::default(),
                viewport: size(800.0, 500.0),
                measurer: Arc::new(DeterministicMeasurer::default()),
            }
        }
    }

    impl HeadlessLayouter {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_options(mut self, options: mindwrap_core::MindmapOptions) -> Self {
            self.options = options;
            self
        }

        pub fn with_viewport(mut self, viewport: Size) -> Self {
            self.viewport = viewport;
            self
        }

        pub fn layout_payload_sync(&self, data: mindwrap_core::PayloadNode) -> Result<HeadlessLayout> {
            let mut engine = LayoutEngine::new(&self.options)
                .with_measurer(Arc::clone(&self.measurer))
                .with_viewport(self.viewport);
            engine.set_data(Some(data), None)?;
            let transform = engine.fit(None);
            let frame = engine.frame().cloned().unwrap_or_default();
            Ok(HeadlessLayout { frame, transform })
        }

        pub fn layout_html_sync(&self, html: &str) -> Result<HeadlessLayout> {
            let title = self.options.title.as_deref();
            self.layout_payload_sync(self.transformer.transform(html, title))
        }

        pub fn layout_markdown_sync(&self, markdown: &str) -> Result<HeadlessLayout> {
            let title = self.options.title.as_deref();
            self.layout_payload_sync(self.transformer.transform_markdown(markdown, title))
        }
    }

    /// Synchronous layout helper (executor-free).
    pub fn layout_html_sync(
        html: &str,
        options: &mindwrap_core::MindmapOptions,
        viewport: Size,
    ) -> Result<HeadlessLayout> {
        HeadlessLayouter::new()
            .with_options(options.clone())
            .with_viewport(viewport)
            .layout_html_sync(html)
    }

    pub fn layout_markdown_sync(
        markdown: &str,
        options: &mindwrap_core::MindmapOptions,
        viewport: Size,
    ) -> Result<HeadlessLayout> {
        HeadlessLayouter::new()
            .with_options(options.clone())
            .with_viewport(viewport)
            .layout_markdown_sync(markdown)
    }

    pub async fn layout_html(
        html: &str,
        options: &mindwrap_core::MindmapOptions,
        viewport: Size,
    ) -> Result<HeadlessLayout> {
        layout_html_sync(html, options, viewport)
    }

    pub async fn layout_markdown(
        markdown: &str,
        options: &mindwrap_core::MindmapOptions,
        viewport: Size,
    ) -> Result<HeadlessLayout> {
        layout_markdown_sync(markdown, options, viewport)
    }
}
