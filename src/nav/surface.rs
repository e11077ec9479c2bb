//! Visual surface lifecycle
//!
//! A `Surface` wraps a user `View` and owns the two pieces of state the
//! navigator cares about: whether the surface is active, and whether it
//! currently lets input through. Everything visual (what "active" looks like,
//! how a transition animates) stays in the `View`.

use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared switch that lets input reach a surface.
///
/// Clones share the same flag, so a renderer or input layer can hold one and
/// observe what the navigator decided.
#[derive(Debug, Clone, Default)]
pub struct InputGate(Arc<AtomicBool>);

impl InputGate {
    /// New gate, closed
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn set_open(&self, open: bool) {
        self.0.store(open, Ordering::SeqCst);
    }
}

/// User-side visual element.
///
/// Every method has a default, so a view only overrides what it animates.
/// Transitions may suspend; the hooks around them run synchronously.
#[async_trait]
pub trait View: Send + Sync + 'static {
    /// One-time setup, called after the owning presenter initialized
    fn initialize(&self) {}

    /// Views that never take input (pure overlays) return false and get no gate
    fn accepts_input(&self) -> bool {
        true
    }

    fn on_enter_before(&self) {}

    async fn transition_in(&self) -> Result<()> {
        Ok(())
    }

    fn on_enter_after(&self) {}

    fn on_exit_before(&self) {}

    async fn transition_out(&self) -> Result<()> {
        Ok(())
    }

    fn on_exit_after(&self) {}

    /// Called once from `Navigator::shutdown`
    fn release(&self) {}
}

/// A view plus its activation flag and input gate
pub struct Surface<V> {
    view: V,
    active: AtomicBool,
    gate: Option<InputGate>,
}

impl<V: View> Surface<V> {
    pub fn new(view: V) -> Self {
        let gate = view.accepts_input().then(InputGate::new);
        Self {
            view,
            active: AtomicBool::new(false),
            gate,
        }
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    /// The gate, if this surface takes input at all
    pub fn gate(&self) -> Option<&InputGate> {
        self.gate.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// False when there is no gate
    pub fn input_enabled(&self) -> bool {
        self.gate.as_ref().map_or(false, InputGate::is_open)
    }

    /// No-op when there is no gate
    pub fn set_input_enabled(&self, enabled: bool) {
        if let Some(gate) = &self.gate {
            gate.set_open(enabled);
        }
    }

    pub fn initialize(&self) {
        self.view.initialize();
    }

    /// Activate, then run the enter hooks around the transition-in
    pub async fn show(&self) -> Result<()> {
        self.active.store(true, Ordering::SeqCst);
        self.view.on_enter_before();
        self.view.transition_in().await?;
        self.view.on_enter_after();
        Ok(())
    }

    /// Run the exit hooks around the transition-out, then deactivate.
    ///
    /// The surface ends inactive even when the transition fails; the
    /// after-exit hook only runs on success.
    pub async fn hide(&self) -> Result<()> {
        self.view.on_exit_before();
        let result = self.view.transition_out().await;
        if result.is_ok() {
            self.view.on_exit_after();
        }
        self.active.store(false, Ordering::SeqCst);
        result
    }

    /// Mark inactive and close the gate without touching the view
    pub(crate) fn deactivate(&self) {
        self.set_input_enabled(false);
        self.active.store(false, Ordering::SeqCst);
    }

    pub(crate) fn release(&self) {
        debug!("Releasing surface {}", std::any::type_name::<V>());
        self.deactivate();
        self.view.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<&'static str>>,
        fail_out: bool,
    }

    impl Recorder {
        fn push(&self, call: &'static str) {
            self.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl View for Recorder {
        fn on_enter_before(&self) {
            self.push("enter_before");
        }

        async fn transition_in(&self) -> Result<()> {
            self.push("transition_in");
            Ok(())
        }

        fn on_enter_after(&self) {
            self.push("enter_after");
        }

        fn on_exit_before(&self) {
            self.push("exit_before");
        }

        async fn transition_out(&self) -> Result<()> {
            self.push("transition_out");
            if self.fail_out {
                bail!("animation clip missing");
            }
            Ok(())
        }

        fn on_exit_after(&self) {
            self.push("exit_after");
        }
    }

    struct Overlay;

    impl View for Overlay {
        fn accepts_input(&self) -> bool {
            false
        }
    }

    #[tokio::test]
    async fn test_show_then_hide_hook_order() {
        let surface = Surface::new(Recorder::default());
        assert!(!surface.is_active());

        surface.show().await.unwrap();
        assert!(surface.is_active());

        surface.hide().await.unwrap();
        assert!(!surface.is_active());

        assert_eq!(
            surface.view().calls(),
            vec![
                "enter_before",
                "transition_in",
                "enter_after",
                "exit_before",
                "transition_out",
                "exit_after",
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_hide_still_deactivates() {
        let surface = Surface::new(Recorder {
            fail_out: true,
            ..Default::default()
        });
        surface.show().await.unwrap();

        assert!(surface.hide().await.is_err());
        assert!(!surface.is_active());
        assert!(!surface.view().calls().contains(&"exit_after"));
    }

    #[test]
    fn test_input_gate_passthrough() {
        let surface = Surface::new(Recorder::default());
        assert!(!surface.input_enabled());

        let shared = surface.gate().cloned().unwrap();
        surface.set_input_enabled(true);
        assert!(shared.is_open());

        shared.set_open(false);
        assert!(!surface.input_enabled());
    }

    #[test]
    fn test_missing_gate_reads_false_and_ignores_writes() {
        let surface = Surface::new(Overlay);
        assert!(surface.gate().is_none());

        surface.set_input_enabled(true);
        assert!(!surface.input_enabled());
    }
}
