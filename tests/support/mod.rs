//! Shared fixtures for navigation tests
//!
//! Every view writes what happens to it into a shared `Journal`, so tests can
//! assert on the exact order of hooks and transitions across controllers.

#![allow(dead_code)]

use anyhow::{Result, bail};
use async_trait::async_trait;
use navstack::{Controller, Navigator, NavigatorConfig, Presenter, View, ViewRegistry};
use navstack::nav::DefaultInjector;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

#[derive(Default)]
pub struct Journal(Mutex<Vec<String>>);

impl Journal {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn position(&self, entry: &str) -> Option<usize> {
        self.entries().iter().position(|e| e == entry)
    }

    pub fn count(&self, entry: &str) -> usize {
        self.entries().iter().filter(|e| *e == entry).count()
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.position(entry).is_some()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

/// How the next view built under a name behaves
#[derive(Clone, Default)]
pub struct ViewScript {
    pub hold_in: Option<Arc<Notify>>,
    pub hold_out: Option<Arc<Notify>>,
    pub fail_in: bool,
    pub fail_out: bool,
    pub fail_build: bool,
}

pub struct JournalView {
    pub name: String,
    pub journal: Arc<Journal>,
    script: ViewScript,
}

impl JournalView {
    fn log(&self, what: &str) {
        self.journal.push(format!("{}:{}", self.name, what));
    }
}

#[async_trait]
impl View for JournalView {
    fn initialize(&self) {
        self.log("init");
    }

    async fn transition_in(&self) -> Result<()> {
        if let Some(gate) = &self.script.hold_in {
            gate.notified().await;
        }
        self.log("in");
        if self.script.fail_in {
            bail!("{} could not animate in", self.name);
        }
        Ok(())
    }

    async fn transition_out(&self) -> Result<()> {
        self.log("out");
        if let Some(gate) = &self.script.hold_out {
            gate.notified().await;
        }
        if self.script.fail_out {
            bail!("{} could not animate out", self.name);
        }
        Ok(())
    }

    fn release(&self) {
        self.log("release");
    }
}

#[derive(Default)]
pub struct JournalPresenter;

impl Presenter for JournalPresenter {
    type View = JournalView;

    fn on_initialize(&self, view: &JournalView) {
        view.log("presenter.init");
    }

    fn on_enter(&self, view: &JournalView) {
        view.log("enter");
    }

    fn on_exit(&self, view: &JournalView) {
        view.log("exit");
    }
}

/// Same view type, different presenter; used for typed mismatches
#[derive(Default)]
pub struct DialogPresenter;

impl Presenter for DialogPresenter {
    type View = JournalView;
}

/// Builds navigators whose views share one journal
#[derive(Clone, Default)]
pub struct Rig {
    pub journal: Arc<Journal>,
    scripts: Arc<Mutex<HashMap<String, ViewScript>>>,
}

impl Rig {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self, name: &str, edit: impl FnOnce(&mut ViewScript)) {
        let mut scripts = self.scripts.lock().unwrap();
        edit(scripts.entry(name.to_string()).or_default());
    }

    /// Transition-in of `name` waits until the returned gate is notified
    pub fn hold_in(&self, name: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.script(name, |script| script.hold_in = Some(gate.clone()));
        gate
    }

    /// Transition-out of `name` waits until the returned gate is notified
    pub fn hold_out(&self, name: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.script(name, |script| script.hold_out = Some(gate.clone()));
        gate
    }

    pub fn fail_in(&self, name: &str) {
        self.script(name, |script| script.fail_in = true);
    }

    pub fn fail_out(&self, name: &str) {
        self.script(name, |script| script.fail_out = true);
    }

    pub fn fail_build(&self, name: &str) {
        self.script(name, |script| script.fail_build = true);
    }

    pub fn registry(&self, names: &[&str]) -> ViewRegistry {
        let mut registry = ViewRegistry::new();
        for name in names {
            let name = name.to_string();
            let journal = self.journal.clone();
            let scripts = self.scripts.clone();
            registry.register::<JournalPresenter>(name.clone(), move || {
                let script = scripts.lock().unwrap().get(&name).cloned().unwrap_or_default();
                if script.fail_build {
                    bail!("no asset for {}", name);
                }
                Ok(JournalView {
                    name: name.clone(),
                    journal: journal.clone(),
                    script,
                })
            });
        }
        registry
    }

    pub fn navigator(&self, names: &[&str]) -> Navigator {
        self.navigator_with(names, NavigatorConfig::default())
    }

    pub fn navigator_with(&self, names: &[&str], config: NavigatorConfig) -> Navigator {
        Navigator::new(self.registry(names), DefaultInjector, config)
    }
}

pub fn names(controllers: &[Controller]) -> Vec<String> {
    controllers.iter().map(|c| c.name().to_string()).collect()
}

/// Give spawned navigation tasks a chance to run up to their next suspension
pub async fn let_tasks_run() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

/// At most one on-screen controller has input, and if one does it is the top
pub fn assert_single_input_holder(navigator: &Navigator) {
    let page = navigator.current_page();
    let popups = navigator.popups();
    let on_screen: Vec<&Controller> = popups.iter().chain(page.iter()).collect();

    let holders: Vec<&&Controller> = on_screen.iter().filter(|c| c.input_enabled()).collect();
    assert!(holders.len() <= 1, "more than one input holder: {:?}", holders);

    if let Some(holder) = holders.first() {
        let top = popups.last().or(page.as_ref());
        assert_eq!(Some(**holder), top, "input held by a surface that is not on top");
    }
}

/// After settling, exactly the top surface has input
pub fn assert_top_has_input(navigator: &Navigator) {
    assert_single_input_holder(navigator);
    let top = navigator.top_popup().or_else(|| navigator.current_page());
    assert_eq!(navigator.input_holder(), top);
}
