//! The navigation engine
//!
//! One `Navigator` owns the page reference, the popup stack and the instance
//! cache. Page changes and popup shows run as spawned tasks so callers get
//! control back immediately; each returns a `Completion` that resolves to the
//! step's result. All bookkeeping happens under a plain mutex that is never
//! held across an await, so the transitions themselves run unlocked.
//!
//! Input routing is recomputed from scratch after every state change: the
//! top popup (else the page) gets input once it has finished showing, every
//! other surface on screen has it disabled.

use log::{debug, info, warn};
use std::any::type_name;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use super::controller::{Controller, Presenter, TypedController};
use super::error::NavError;
use super::event::NavEvent;
use super::lifecycle::{PageChangePolicy, Phase};
use super::registry::{DefaultInjector, Injector, ViewCatalog, ViewRegistry};
use crate::config::NavigatorConfig;

/// Handle to a navigation step running in the background.
///
/// Await it for the step's result. Dropping it lets the step run to
/// completion unobserved.
pub struct Completion<T> {
    name: String,
    handle: JoinHandle<Result<T, NavError>>,
}

impl<T> Completion<T> {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl<T> Future for Completion<T> {
    type Output = Result<T, NavError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.handle).poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(err)) => Poll::Ready(Err(NavError::Aborted {
                name: self.name.clone(),
                reason: err.to_string(),
            })),
        }
    }
}

impl<T> fmt::Debug for Completion<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("name", &self.name)
            .field("finished", &self.is_finished())
            .finish()
    }
}

/// How a page change ended
#[derive(Debug, Clone)]
pub enum PageOutcome {
    /// The page is current and finished showing
    Shown(Controller),

    /// A newer page change was requested before this one started
    Superseded,
}

impl PageOutcome {
    pub fn controller(&self) -> Option<&Controller> {
        match self {
            PageOutcome::Shown(controller) => Some(controller),
            PageOutcome::Superseded => None,
        }
    }
}

/// A popup that has been pushed; `shown` resolves once its Show finished
#[derive(Debug)]
pub struct Popup<C = Controller> {
    pub controller: C,
    pub shown: Completion<()>,
}

#[derive(Default)]
struct NavState {
    page: Option<Controller>,
    popups: Vec<Controller>,
    instances: HashMap<String, Controller>,
}

impl NavState {
    fn is_on_screen(&self, controller: &Controller) -> bool {
        self.page.as_ref() == Some(controller) || self.popups.contains(controller)
    }

    /// Enable input for the topmost settled surface, disable it everywhere else
    fn route_input(&self) {
        let holder = self.popups.last().or(self.page.as_ref());
        for controller in self.popups.iter().chain(self.page.iter()) {
            let enabled = Some(controller) == holder && controller.phase() == Phase::Shown;
            controller.set_input_enabled(enabled);
        }
    }
}

pub(crate) struct NavigatorInner {
    catalog: Box<dyn ViewCatalog>,
    injector: Box<dyn Injector>,
    config: NavigatorConfig,
    state: Mutex<NavState>,
    construct_lock: Mutex<()>,
    page_slot: tokio::sync::Mutex<()>,
    page_generation: AtomicU64,
    closed: AtomicBool,
    in_flight: watch::Sender<usize>,
    events: broadcast::Sender<NavEvent>,
}

/// Decrements the in-flight counter when a spawned step ends, however it ends
struct InFlight(Arc<NavigatorInner>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.in_flight.send_modify(|count| *count = count.saturating_sub(1));
    }
}

/// Page and popup navigation over a catalog of views
#[derive(Clone)]
pub struct Navigator {
    inner: Arc<NavigatorInner>,
}

impl Navigator {
    pub fn new(
        catalog: impl ViewCatalog + 'static,
        injector: impl Injector + 'static,
        config: NavigatorConfig,
    ) -> Self {
        let (in_flight, _) = watch::channel(0);
        let (events, _) = broadcast::channel(config.event_capacity.max(1));

        Self {
            inner: Arc::new(NavigatorInner {
                catalog: Box::new(catalog),
                injector: Box::new(injector),
                config,
                state: Mutex::new(NavState::default()),
                construct_lock: Mutex::new(()),
                page_slot: tokio::sync::Mutex::new(()),
                page_generation: AtomicU64::new(0),
                closed: AtomicBool::new(false),
                in_flight,
                events,
            }),
        }
    }

    /// Navigator over a registry, with the default injector and config
    pub fn from_registry(registry: ViewRegistry) -> Self {
        Self::new(registry, DefaultInjector, NavigatorConfig::default())
    }

    pub(crate) fn from_inner(inner: Arc<NavigatorInner>) -> Self {
        Self { inner }
    }

    pub fn config(&self) -> &NavigatorConfig {
        &self.inner.config
    }

    /// Receiver for navigation events sent from now on
    pub fn subscribe(&self) -> broadcast::Receiver<NavEvent> {
        self.inner.events.subscribe()
    }

    /// Make `name` the current page.
    ///
    /// Returns at once; the change runs after `settle_steps` scheduler
    /// yields. It hides the current page, resolves `name` and shows it.
    /// Changes never overlap: each waits for the previous one to finish, and
    /// under `PageChangePolicy::Supersede` only the newest waiting change
    /// runs.
    pub fn change_page(&self, name: impl Into<String>) -> Completion<PageOutcome> {
        let name = name.into();
        let generation = self.inner.page_generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("Page change to '{}' requested (#{})", name, generation);

        let navigator = self.clone();
        let task_name = name.clone();
        self.spawn_step(name, async move { navigator.run_page_change(task_name, generation).await })
    }

    /// Push the popup registered under `name` and start showing it.
    ///
    /// Input is taken from the current holder right away; the popup gets it
    /// once its Show has finished, if it is still on top by then.
    pub fn show_popup(&self, name: &str) -> Result<Popup, NavError> {
        let controller = self.resolve(name)?;
        self.open_popup(controller)
    }

    /// `show_popup`, with the presenter type checked before anything changes
    pub fn show_popup_typed<P: Presenter>(&self, name: &str) -> Result<Popup<TypedController<P>>, NavError> {
        let controller = self.resolve(name)?;
        let typed = controller.downcast::<P>().ok_or_else(|| NavError::TypeMismatch {
            name: name.to_string(),
            expected: type_name::<P>(),
            actual: controller.presenter_type(),
        })?;

        let popup = self.open_popup(controller)?;
        Ok(Popup {
            controller: typed,
            shown: popup.shown,
        })
    }

    /// Hide `controller` if it is the top popup.
    ///
    /// Returns `Ok(false)` without touching anything otherwise. A failed Hide
    /// still removes the popup and re-routes input before the error is
    /// returned.
    pub async fn hide_popup(&self, controller: &Controller) -> Result<bool, NavError> {
        self.ensure_open()?;

        if self.state().popups.last() != Some(controller) {
            debug!("Ignoring hide of '{}': not the top popup", controller.name());
            return Ok(false);
        }

        let result = controller.hide().await;
        if matches!(result, Err(NavError::Busy { .. })) {
            return result.map(|()| false);
        }

        let depth = {
            let mut state = self.state();
            state.popups.retain(|popup| popup != controller);
            controller.set_input_enabled(false);
            state.route_input();
            state.popups.len()
        };

        match result {
            Ok(()) => {
                info!("Popup '{}' closed ({} left)", controller.name(), depth);
                self.emit(NavEvent::PopupClosed {
                    name: controller.name().to_string(),
                    depth,
                });
                Ok(true)
            }
            Err(err) => {
                warn!("Popup '{}' removed after failed hide: {}", controller.name(), err);
                Err(err)
            }
        }
    }

    /// Cached controller for `name`, creating and initializing it on first use
    pub fn resolve(&self, name: &str) -> Result<Controller, NavError> {
        self.ensure_open()?;

        if let Some(controller) = self.cached(name) {
            return Ok(controller);
        }

        let _construct = self
            .inner
            .construct_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        // Someone else may have built it while we waited
        if let Some(controller) = self.cached(name) {
            return Ok(controller);
        }

        let controller = self.create(name).map_err(|err| {
            warn!("Cannot create '{}': {}", name, err);
            err
        })?;
        controller.initialize();

        self.state().instances.insert(name.to_string(), controller.clone());
        info!("Created controller '{}' ({})", name, controller.presenter_type());
        Ok(controller)
    }

    /// Release every cached controller and refuse further requests.
    ///
    /// Popups go first (top down), then the page, then the rest of the cache
    /// in name order. Returns the released names in that order.
    pub fn shutdown(&self) -> Vec<String> {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return Vec::new();
        }

        let (popups, page, instances) = {
            let mut state = self.state();
            (
                std::mem::take(&mut state.popups),
                state.page.take(),
                std::mem::take(&mut state.instances),
            )
        };

        let mut order: Vec<Controller> = popups.into_iter().rev().collect();
        order.extend(page);

        let mut rest: Vec<(String, Controller)> = instances
            .into_iter()
            .filter(|(_, controller)| !order.contains(controller))
            .collect();
        rest.sort_by(|a, b| a.0.cmp(&b.0));
        order.extend(rest.into_iter().map(|(_, controller)| controller));

        let released: Vec<String> = order
            .iter()
            .map(|controller| {
                controller.release();
                controller.name().to_string()
            })
            .collect();

        info!("Navigator shut down, released {} controllers", released.len());
        released
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Wait until every spawned page change and popup show has finished
    pub async fn settle(&self) {
        let mut in_flight = self.inner.in_flight.subscribe();
        let _ = in_flight.wait_for(|count| *count == 0).await;
    }

    pub fn current_page(&self) -> Option<Controller> {
        self.state().page.clone()
    }

    /// Popup stack, bottom first
    pub fn popups(&self) -> Vec<Controller> {
        self.state().popups.clone()
    }

    pub fn popup_names(&self) -> Vec<String> {
        self.state()
            .popups
            .iter()
            .map(|popup| popup.name().to_string())
            .collect()
    }

    pub fn top_popup(&self) -> Option<Controller> {
        self.state().popups.last().cloned()
    }

    /// The on-screen controller whose input is currently enabled
    pub fn input_holder(&self) -> Option<Controller> {
        let state = self.state();
        state
            .popups
            .iter()
            .rev()
            .chain(state.page.iter())
            .find(|controller| controller.input_enabled())
            .cloned()
    }

    pub fn cached(&self, name: &str) -> Option<Controller> {
        self.state().instances.get(name).cloned()
    }

    /// Names of every cached controller, sorted
    pub fn cached_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state().instances.keys().cloned().collect();
        names.sort();
        names
    }

    fn create(&self, name: &str) -> Result<Controller, NavError> {
        let entry = self
            .inner
            .catalog
            .find(name)
            .ok_or_else(|| NavError::NotFound(name.to_string()))?;

        let view = self
            .inner
            .injector
            .construct(entry)
            .map_err(|cause| NavError::construction(name, cause))?;

        let controller = entry.assemble(view, self.inner.injector.as_ref())?;
        controller.attach(Arc::downgrade(&self.inner));
        Ok(controller)
    }

    fn open_popup(&self, controller: Controller) -> Result<Popup, NavError> {
        {
            let mut state = self.state();
            if state.is_on_screen(&controller) {
                return Err(NavError::AlreadyActive(controller.name().to_string()));
            }

            // Claim the Showing phase now so an early Hide queues behind it
            controller.reserve_show()?;
            state.popups.push(controller.clone());
            state.route_input();
            debug!("Pushed popup '{}' (depth {})", controller.name(), state.popups.len());
        }

        let navigator = self.clone();
        let task_controller = controller.clone();
        let shown = self.spawn_step(controller.name().to_string(), async move {
            navigator.run_popup_show(task_controller).await
        });

        Ok(Popup { controller, shown })
    }

    async fn run_popup_show(&self, controller: Controller) -> Result<(), NavError> {
        self.yield_steps().await;
        self.ensure_open()?;

        let result = controller.run_show().await;

        let depth = {
            let state = self.state();
            state.route_input();
            state.popups.iter().position(|popup| popup == &controller).map(|index| index + 1)
        };

        match result {
            Ok(()) => {
                if let Some(depth) = depth {
                    info!("Popup '{}' shown (depth {})", controller.name(), depth);
                    self.emit(NavEvent::PopupOpened {
                        name: controller.name().to_string(),
                        depth,
                    });
                }
                Ok(())
            }
            Err(err) => {
                warn!("Popup '{}' failed to show: {}", controller.name(), err);
                Err(err)
            }
        }
    }

    async fn run_page_change(&self, name: String, generation: u64) -> Result<PageOutcome, NavError> {
        self.yield_steps().await;
        let _slot = self.inner.page_slot.lock().await;
        self.ensure_open()?;

        if self.inner.config.page_change_policy == PageChangePolicy::Supersede
            && self.inner.page_generation.load(Ordering::SeqCst) != generation
        {
            debug!("Page change to '{}' superseded", name);
            return Ok(PageOutcome::Superseded);
        }

        if self.state().popups.iter().any(|popup| popup.name() == name) {
            return Err(NavError::AlreadyActive(name));
        }

        let previous = self.state().page.clone();
        if let Some(previous) = &previous {
            debug!("Hiding page '{}'", previous.name());
            let hidden = previous.hide().await;

            {
                let mut state = self.state();
                state.page = None;
                state.route_input();
            }

            if let Err(err) = hidden {
                warn!("Page '{}' failed to hide, continuing to '{}': {}", previous.name(), name, err);
            }
        }

        let controller = self.resolve(&name).map_err(|err| {
            warn!("Page change to '{}' aborted, no page is active: {}", name, err);
            err
        })?;

        {
            let mut state = self.state();
            // A popup may have claimed it while the old page was hiding
            if state.popups.contains(&controller) {
                warn!("Page change to '{}' aborted, it was opened as a popup", name);
                return Err(NavError::AlreadyActive(name));
            }
            state.page = Some(controller.clone());
            state.route_input();
        }

        let result = controller.show().await;
        self.state().route_input();

        match result {
            Ok(()) => {
                let from = previous.map(|page| page.name().to_string());
                info!("Page changed: {:?} -> '{}'", from, name);
                self.emit(NavEvent::PageChanged { from, to: name });
                Ok(PageOutcome::Shown(controller))
            }
            Err(err) => {
                warn!("Page '{}' failed to show: {}", name, err);
                Err(err)
            }
        }
    }

    fn spawn_step<T, F>(&self, name: String, step: F) -> Completion<T>
    where
        T: Send + 'static,
        F: Future<Output = Result<T, NavError>> + Send + 'static,
    {
        self.inner.in_flight.send_modify(|count| *count += 1);
        let in_flight = InFlight(self.inner.clone());

        let handle = tokio::spawn(async move {
            let _in_flight = in_flight;
            step.await
        });

        Completion { name, handle }
    }

    async fn yield_steps(&self) {
        for _ in 0..self.inner.config.settle_steps {
            tokio::task::yield_now().await;
        }
    }

    fn emit(&self, event: NavEvent) {
        // No receivers is fine
        let _ = self.inner.events.send(event);
    }

    fn ensure_open(&self) -> Result<(), NavError> {
        if self.is_shut_down() {
            Err(NavError::ShutDown)
        } else {
            Ok(())
        }
    }

    fn state(&self) -> MutexGuard<'_, NavState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Navigator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("Navigator")
            .field("page", &state.page.as_ref().map(Controller::name))
            .field(
                "popups",
                &state.popups.iter().map(Controller::name).collect::<Vec<_>>(),
            )
            .field("cached", &state.instances.len())
            .finish()
    }
}
