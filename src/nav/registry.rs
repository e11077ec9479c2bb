//! Name → controller factories
//!
//! `ViewCatalog` and `Injector` are the seams to the host application: the
//! catalog says what can be built under a name, the injector builds the view
//! and wires the presenter's dependencies. `ViewRegistry` and
//! `DefaultInjector` are the plain implementations used when the host has
//! nothing more specific.

use anyhow::Result;
use log::warn;
use std::any::{Any, type_name};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::controller::{Controller, Presenter};
use super::error::NavError;

/// A view instance before it has been matched to its presenter
pub type ErasedView = Box<dyn Any + Send + Sync>;

type ViewFactory = Arc<dyn Fn() -> Result<ErasedView> + Send + Sync>;
type Assembler = Arc<dyn Fn(&str, ErasedView, &dyn Injector) -> Result<Controller, NavError> + Send + Sync>;

/// Everything needed to build the controller for one logical name
#[derive(Clone)]
pub struct ViewEntry {
    name: String,
    view_type: &'static str,
    presenter_type: &'static str,
    make_view: ViewFactory,
    assemble: Assembler,
}

impl ViewEntry {
    /// Entry building `P` around views produced by `view_factory`
    pub fn new<P, V, C>(name: impl Into<String>, view_factory: V, presenter_factory: C) -> Self
    where
        P: Presenter,
        V: Fn() -> Result<P::View> + Send + Sync + 'static,
        C: Fn() -> P + Send + Sync + 'static,
    {
        let make_view: ViewFactory = Arc::new(move || -> Result<ErasedView> {
            let view = view_factory()?;
            Ok(Box::new(view) as ErasedView)
        });

        let assemble: Assembler = Arc::new(
            move |name: &str, view: ErasedView, injector: &dyn Injector| -> Result<Controller, NavError> {
                let view = view.downcast::<P::View>().map_err(|_| NavError::TypeMismatch {
                    name: name.to_string(),
                    expected: type_name::<P::View>(),
                    actual: "a different view type",
                })?;

                let mut presenter = presenter_factory();
                injector
                    .wire(name, &mut presenter)
                    .map_err(|cause| NavError::construction(name, cause))?;

                Ok(Controller::new(name, presenter, *view))
            },
        );

        Self {
            name: name.into(),
            view_type: type_name::<P::View>(),
            presenter_type: type_name::<P>(),
            make_view,
            assemble,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn view_type(&self) -> &'static str {
        self.view_type
    }

    pub fn presenter_type(&self) -> &'static str {
        self.presenter_type
    }

    /// Run the registered view factory
    pub fn instantiate(&self) -> Result<ErasedView> {
        (self.make_view)()
    }

    /// Pair a constructed view with a new presenter
    pub(crate) fn assemble(&self, view: ErasedView, injector: &dyn Injector) -> Result<Controller, NavError> {
        (self.assemble)(&self.name, view, injector)
    }
}

impl fmt::Debug for ViewEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewEntry")
            .field("name", &self.name)
            .field("view_type", &self.view_type)
            .field("presenter_type", &self.presenter_type)
            .finish()
    }
}

/// Lookup of view entries by logical name
pub trait ViewCatalog: Send + Sync {
    fn find(&self, name: &str) -> Option<&ViewEntry>;
}

/// Builds views and wires presenter dependencies
pub trait Injector: Send + Sync {
    /// Produce the view for `entry`; the default runs the entry's own factory
    fn construct(&self, entry: &ViewEntry) -> Result<ErasedView> {
        entry.instantiate()
    }

    /// Inject dependencies into a freshly created presenter
    fn wire(&self, _name: &str, _presenter: &mut (dyn Any + Send + Sync)) -> Result<()> {
        Ok(())
    }
}

/// Injector that only runs factories
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultInjector;

impl Injector for DefaultInjector {}

/// Explicit table of view entries
#[derive(Debug, Default, Clone)]
pub struct ViewRegistry {
    entries: HashMap<String, ViewEntry>,
}

impl ViewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `P` with a default presenter and views from `view_factory`
    pub fn register<P>(
        &mut self,
        name: impl Into<String>,
        view_factory: impl Fn() -> Result<P::View> + Send + Sync + 'static,
    ) -> &mut Self
    where
        P: Presenter + Default,
    {
        self.register_entry(ViewEntry::new(name, view_factory, P::default))
    }

    /// Register `P` where both presenter and view are `Default`
    pub fn register_default<P>(&mut self, name: impl Into<String>) -> &mut Self
    where
        P: Presenter + Default,
        P::View: Default,
    {
        self.register::<P>(name, || Ok(P::View::default()))
    }

    /// Register a prepared entry, replacing any entry with the same name
    pub fn register_entry(&mut self, entry: ViewEntry) -> &mut Self {
        if let Some(previous) = self.entries.insert(entry.name.clone(), entry) {
            warn!(
                "Replaced view entry '{}' ({})",
                previous.name, previous.presenter_type
            );
        }
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ViewCatalog for ViewRegistry {
    fn find(&self, name: &str) -> Option<&ViewEntry> {
        self.entries.get(name)
    }
}
