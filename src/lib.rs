pub mod config;
pub mod demo;
pub mod nav;

pub use config::NavigatorConfig;
pub use nav::{
    Completion, Controller, NavError, NavEvent, Navigator, PageChangePolicy, PageOutcome, Phase,
    Popup, Presenter, TypedController, View, ViewRegistry,
};
