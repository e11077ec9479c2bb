//! Controllers: a presenter bound to its surface
//!
//! A `Controller` is a cheap, clonable handle. Clones compare equal and share
//! everything: phase, hooks, input gate. The navigator hands the same handle
//! to every caller that asks for the same name.

use anyhow::Result;
use async_trait::async_trait;
use log::{debug, warn};
use std::any::{Any, type_name};
use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, Weak};
use tokio::sync::watch;

use super::error::NavError;
use super::lifecycle::Phase;
use super::navigator::{Navigator, NavigatorInner};
use super::surface::{Surface, View};

/// User-side logic that drives one kind of view.
///
/// All hooks run synchronously on the navigation task; keep them short.
pub trait Presenter: Send + Sync + 'static {
    type View: View;

    /// Runs once, before the first Show
    fn on_initialize(&self, _view: &Self::View) {}

    /// Runs at the start of every Show, before the transition-in
    fn on_enter(&self, _view: &Self::View) {}

    /// Runs at the end of every successful Hide, after the transition-out
    fn on_exit(&self, _view: &Self::View) {}
}

/// Unique identifier for a controller instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControllerId(pub uuid::Uuid);

impl ControllerId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

type HideHook = Box<dyn FnOnce(&Controller) + Send>;

#[derive(Default)]
struct HideHooks {
    before: Option<HideHook>,
    after: Option<HideHook>,
}

/// Object-safe face of a presenter and its surface
#[async_trait]
trait Binding: Send + Sync {
    fn initialize(&self);
    fn on_enter(&self);
    fn on_exit(&self);
    async fn show_surface(&self) -> Result<()>;
    async fn hide_surface(&self) -> Result<()>;
    fn is_active(&self) -> bool;
    fn input_enabled(&self) -> bool;
    fn set_input_enabled(&self, enabled: bool);
    fn release(&self);
    fn deactivate(&self);
    fn presenter_any(&self) -> Arc<dyn Any + Send + Sync>;
    fn surface_any(&self) -> Arc<dyn Any + Send + Sync>;
    fn presenter_type(&self) -> &'static str;
}

struct Bound<P: Presenter> {
    presenter: Arc<P>,
    surface: Arc<Surface<P::View>>,
}

#[async_trait]
impl<P: Presenter> Binding for Bound<P> {
    fn initialize(&self) {
        self.presenter.on_initialize(self.surface.view());
        self.surface.initialize();
    }

    fn on_enter(&self) {
        self.presenter.on_enter(self.surface.view());
    }

    fn on_exit(&self) {
        self.presenter.on_exit(self.surface.view());
    }

    async fn show_surface(&self) -> Result<()> {
        self.surface.show().await
    }

    async fn hide_surface(&self) -> Result<()> {
        self.surface.hide().await
    }

    fn is_active(&self) -> bool {
        self.surface.is_active()
    }

    fn input_enabled(&self) -> bool {
        self.surface.input_enabled()
    }

    fn set_input_enabled(&self, enabled: bool) {
        self.surface.set_input_enabled(enabled);
    }

    fn release(&self) {
        self.surface.release();
    }

    fn deactivate(&self) {
        self.surface.deactivate();
    }

    fn presenter_any(&self) -> Arc<dyn Any + Send + Sync> {
        self.presenter.clone()
    }

    fn surface_any(&self) -> Arc<dyn Any + Send + Sync> {
        self.surface.clone()
    }

    fn presenter_type(&self) -> &'static str {
        type_name::<P>()
    }
}

struct ControllerInner {
    id: ControllerId,
    name: String,
    binding: Box<dyn Binding>,
    phase: watch::Sender<Phase>,
    initialized: AtomicBool,
    released: AtomicBool,
    hooks: Mutex<HideHooks>,
    navigator: OnceLock<Weak<NavigatorInner>>,
}

/// Handle to a presenter/surface pair and its lifecycle
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

impl Controller {
    /// Bind a presenter to a freshly built view
    pub fn new<P: Presenter>(name: impl Into<String>, presenter: P, view: P::View) -> Self {
        let (phase, _) = watch::channel(Phase::Hidden);
        Self {
            inner: Arc::new(ControllerInner {
                id: ControllerId::new(),
                name: name.into(),
                binding: Box::new(Bound {
                    presenter: Arc::new(presenter),
                    surface: Arc::new(Surface::new(view)),
                }),
                phase,
                initialized: AtomicBool::new(false),
                released: AtomicBool::new(false),
                hooks: Mutex::new(HideHooks::default()),
                navigator: OnceLock::new(),
            }),
        }
    }

    pub(crate) fn attach(&self, navigator: Weak<NavigatorInner>) {
        if self.inner.navigator.set(navigator).is_err() {
            warn!("Controller '{}' is already attached to a navigator", self.inner.name);
        }
    }

    fn navigator(&self) -> Option<Navigator> {
        self.inner
            .navigator
            .get()
            .and_then(Weak::upgrade)
            .map(Navigator::from_inner)
    }

    pub fn id(&self) -> ControllerId {
        self.inner.id
    }

    /// Logical name this controller was registered under
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn phase(&self) -> Phase {
        *self.inner.phase.borrow()
    }

    pub fn is_active(&self) -> bool {
        self.inner.binding.is_active()
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.initialized.load(Ordering::SeqCst)
    }

    /// Type name of the presenter, for diagnostics
    pub fn presenter_type(&self) -> &'static str {
        self.inner.binding.presenter_type()
    }

    /// Reads the surface's input gate
    pub fn input_enabled(&self) -> bool {
        self.inner.binding.input_enabled()
    }

    /// Writes the surface's input gate
    pub fn set_input_enabled(&self, enabled: bool) {
        self.inner.binding.set_input_enabled(enabled);
    }

    /// Presenter hook, then view setup. Only the first call does anything.
    pub fn initialize(&self) {
        if self.inner.initialized.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!("Initializing controller '{}'", self.inner.name);
        self.inner.binding.initialize();
    }

    /// Run the enter hook, then the surface's Show sequence.
    ///
    /// Fails with `Busy` while another transition of this controller runs,
    /// and with `ShutDown` once the controller has been released.
    /// The controller ends up `Shown` even if the transition fails, so it can
    /// still be hidden.
    pub async fn show(&self) -> Result<(), NavError> {
        self.reserve_show()?;
        self.run_show().await
    }

    /// Enter `Showing` without running anything yet
    pub(crate) fn reserve_show(&self) -> Result<(), NavError> {
        if self.is_released() {
            return Err(NavError::ShutDown);
        }
        self.begin(Phase::Showing, Phase::can_show)
    }

    /// The body of a Show whose phase was already reserved
    pub(crate) async fn run_show(&self) -> Result<(), NavError> {
        if self.is_released() {
            return Err(NavError::ShutDown);
        }
        debug!("Showing '{}'", self.inner.name);

        self.inner.binding.on_enter();
        let result = self.inner.binding.show_surface().await;
        if self.is_released() {
            // Shut down while the transition ran; stay Hidden and inactive
            self.inner.binding.deactivate();
            return Err(NavError::ShutDown);
        }
        self.inner.phase.send_replace(Phase::Shown);

        result.map_err(|cause| NavError::transition(&self.inner.name, cause))
    }

    /// Run the hide hooks and the surface's Hide sequence.
    ///
    /// A Hide issued while a Show is in flight waits for the Show to finish.
    /// Both hook slots are empty afterwards, whether or not they fired.
    pub async fn hide(&self) -> Result<(), NavError> {
        self.wait_while_showing().await;
        self.begin(Phase::Hiding, Phase::can_hide)?;
        debug!("Hiding '{}'", self.inner.name);

        let (before, after) = {
            let mut hooks = self.hooks();
            (hooks.before.take(), hooks.after.take())
        };

        if let Some(hook) = before {
            hook(self);
        }

        let result = self.inner.binding.hide_surface().await;
        if result.is_ok() {
            self.inner.binding.on_exit();
            if let Some(hook) = after {
                hook(self);
            }
        }

        // Anything registered while the sequence ran is dropped too
        *self.hooks() = HideHooks::default();
        self.inner.phase.send_replace(Phase::Hidden);

        result.map_err(|cause| NavError::transition(&self.inner.name, cause))
    }

    /// Hide this controller through its navigator.
    ///
    /// Returns `Ok(false)` without doing anything if it is not the top popup
    /// or the navigator is gone.
    pub async fn close(&self) -> Result<bool, NavError> {
        match self.navigator() {
            Some(navigator) => navigator.hide_popup(self).await,
            None => Ok(false),
        }
    }

    /// One-shot callback run at the start of the next Hide; replaces any
    /// previously registered one
    pub fn on_before_hide(&self, hook: impl FnOnce(&Controller) + Send + 'static) -> &Self {
        self.hooks().before = Some(Box::new(hook));
        self
    }

    /// One-shot callback run at the end of the next successful Hide; replaces
    /// any previously registered one
    pub fn on_after_hide(&self, hook: impl FnOnce(&Controller) + Send + 'static) -> &Self {
        self.hooks().after = Some(Box::new(hook));
        self
    }

    pub fn has_hide_hooks(&self) -> bool {
        let hooks = self.hooks();
        hooks.before.is_some() || hooks.after.is_some()
    }

    /// Checked view of this controller as a specific presenter type
    pub fn downcast<P: Presenter>(&self) -> Option<TypedController<P>> {
        let presenter = self.inner.binding.presenter_any().downcast::<P>().ok()?;
        let surface = self
            .inner
            .binding
            .surface_any()
            .downcast::<Surface<P::View>>()
            .ok()?;

        Some(TypedController {
            controller: self.clone(),
            presenter,
            surface,
        })
    }

    pub fn is<P: Presenter>(&self) -> bool {
        self.inner.binding.presenter_any().is::<P>()
    }

    /// True once the owning navigator has shut down
    pub fn is_released(&self) -> bool {
        self.inner.released.load(Ordering::SeqCst)
    }

    pub(crate) fn release(&self) {
        self.inner.released.store(true, Ordering::SeqCst);
        *self.hooks() = HideHooks::default();
        self.inner.binding.release();
        self.inner.phase.send_replace(Phase::Hidden);
    }

    fn begin(&self, next: Phase, allowed: fn(Phase) -> bool) -> Result<(), NavError> {
        let mut current = Phase::Hidden;
        let started = self.inner.phase.send_if_modified(|phase| {
            current = *phase;
            if allowed(*phase) {
                *phase = next;
                true
            } else {
                false
            }
        });

        if started {
            // No input while a transition runs
            self.set_input_enabled(false);
            Ok(())
        } else {
            Err(NavError::Busy {
                name: self.inner.name.clone(),
                phase: current,
            })
        }
    }

    async fn wait_while_showing(&self) {
        let mut phase = self.inner.phase.subscribe();
        // The sender lives as long as `self`, so this cannot fail
        let _ = phase.wait_for(|phase| *phase != Phase::Showing).await;
    }

    fn hooks(&self) -> MutexGuard<'_, HideHooks> {
        self.inner.hooks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PartialEq for Controller {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Controller {}

impl fmt::Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("name", &self.inner.name)
            .field("phase", &self.phase())
            .field("input_enabled", &self.input_enabled())
            .finish()
    }
}

/// A controller whose presenter type has been checked
pub struct TypedController<P: Presenter> {
    controller: Controller,
    presenter: Arc<P>,
    surface: Arc<Surface<P::View>>,
}

impl<P: Presenter> TypedController<P> {
    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn view(&self) -> &P::View {
        self.surface.view()
    }

    pub fn surface(&self) -> &Surface<P::View> {
        &self.surface
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn into_controller(self) -> Controller {
        self.controller
    }

    /// Typed form of `Controller::on_before_hide`
    pub fn on_before_hide(&self, hook: impl FnOnce(&TypedController<P>) + Send + 'static) -> &Self {
        self.controller.on_before_hide(move |controller| {
            if let Some(typed) = controller.downcast::<P>() {
                hook(&typed);
            }
        });
        self
    }

    /// Typed form of `Controller::on_after_hide`
    pub fn on_after_hide(&self, hook: impl FnOnce(&TypedController<P>) + Send + 'static) -> &Self {
        self.controller.on_after_hide(move |controller| {
            if let Some(typed) = controller.downcast::<P>() {
                hook(&typed);
            }
        });
        self
    }
}

impl<P: Presenter> Clone for TypedController<P> {
    fn clone(&self) -> Self {
        Self {
            controller: self.controller.clone(),
            presenter: self.presenter.clone(),
            surface: self.surface.clone(),
        }
    }
}

impl<P: Presenter> Deref for TypedController<P> {
    type Target = Controller;

    fn deref(&self) -> &Controller {
        &self.controller
    }
}

impl<P: Presenter> fmt::Debug for TypedController<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypedController").field(&self.controller).finish()
    }
}
