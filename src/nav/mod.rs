//! Page and popup navigation
//!
//! A `Navigator` keeps one page and a stack of popups on screen. Views are
//! looked up by name in a `ViewCatalog`, built once, and cached as
//! `Controller`s for the navigator's lifetime. Only the topmost surface that
//! has finished showing receives input.

pub mod controller;
pub mod error;
pub mod event;
pub mod lifecycle;
pub mod navigator;
pub mod registry;
pub mod surface;

pub use controller::{Controller, ControllerId, Presenter, TypedController};
pub use error::NavError;
pub use event::NavEvent;
pub use lifecycle::{PageChangePolicy, Phase};
pub use navigator::{Completion, Navigator, PageOutcome, Popup};
pub use registry::{DefaultInjector, ErasedView, Injector, ViewCatalog, ViewEntry, ViewRegistry};
pub use surface::{InputGate, Surface, View};
