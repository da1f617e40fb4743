#![forbid(unsafe_code)]

//! Headless mindmap layout.
//!
//! A [`LayoutEngine`] owns one diagram: it measures node content through an injected
//! [`NodeMeasurer`], places nodes with a non-layered tidy tree ([`flextree`]), and reconciles
//! each pass against the previous one by stable node keys. Viewport math (fit, ensure-view,
//! rescale) lives in [`viewport`].

pub mod color;
pub mod engine;
pub mod flextree;
pub mod geom;
pub mod hooks;
pub mod images;
pub mod measure;
pub mod model;
pub mod options;
pub mod reconcile;
pub mod viewport;

pub use color::ColorAssigner;
pub use engine::{
    AfterRenderEvent, BeforeRenderEvent, EngineHooks, FoldOverride, LayoutEngine, ToggleEvent,
    ZoomCause, ZoomEvent, content_key,
};
pub use hooks::{Hook, HookToken, RefreshHub};
pub use images::{ImageCache, SharedImageCache};
pub use measure::{ContentSize, DeterministicMeasurer, NodeMeasurer, WrapMode};
pub use model::{Bounds, NodeState, PositionedLink, PositionedNode, RenderFrame, TransitionKind};
pub use options::{MAX_DURATION, ViewOptions};
pub use viewport::{GestureInput, GestureKind, Padding, WheelEvent, ZoomTransform};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("duplicate render key: {key}")]
    KeyCollision { key: String },
    #[error("unknown node path: {path}")]
    UnknownPath { path: String },
    #[error(transparent)]
    Core(#[from] mindwrap_core::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
