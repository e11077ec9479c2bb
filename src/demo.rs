//! Demo views and the scripted session run by `navstack-demo`

use anyhow::Result;
use async_trait::async_trait;
use log::{debug, info};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::config::NavigatorConfig;
use crate::nav::{DefaultInjector, Navigator, Presenter, View, ViewRegistry};

/// A view whose transitions just take time
pub struct DemoView {
    label: &'static str,
    transition: Duration,
}

impl DemoView {
    pub fn new(label: &'static str, transition: Duration) -> Self {
        Self { label, transition }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }
}

#[async_trait]
impl View for DemoView {
    fn initialize(&self) {
        debug!("[{}] view initialized", self.label);
    }

    async fn transition_in(&self) -> Result<()> {
        tokio::time::sleep(self.transition).await;
        debug!("[{}] transition in done", self.label);
        Ok(())
    }

    async fn transition_out(&self) -> Result<()> {
        tokio::time::sleep(self.transition).await;
        debug!("[{}] transition out done", self.label);
        Ok(())
    }

    fn release(&self) {
        debug!("[{}] released", self.label);
    }
}

#[derive(Default)]
pub struct MainMenu;

impl Presenter for MainMenu {
    type View = DemoView;

    fn on_enter(&self, view: &DemoView) {
        info!("{} entered", view.label());
    }
}

/// Counts how often the settings panel was opened
#[derive(Default)]
pub struct SettingsPanel {
    opened: AtomicUsize,
}

impl SettingsPanel {
    pub fn times_opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

impl Presenter for SettingsPanel {
    type View = DemoView;

    fn on_enter(&self, _view: &DemoView) {
        self.opened.fetch_add(1, Ordering::SeqCst);
    }
}

/// Yes/no dialog; the answer is whatever was chosen before it closed
#[derive(Default)]
pub struct ConfirmDialog {
    answer: Mutex<Option<bool>>,
}

impl ConfirmDialog {
    pub fn choose(&self, accept: bool) {
        if let Ok(mut answer) = self.answer.lock() {
            *answer = Some(accept);
        }
    }

    pub fn answer(&self) -> Option<bool> {
        self.answer.lock().ok().and_then(|answer| *answer)
    }
}

impl Presenter for ConfirmDialog {
    type View = DemoView;

    fn on_enter(&self, _view: &DemoView) {
        if let Ok(mut answer) = self.answer.lock() {
            *answer = None;
        }
    }
}

#[derive(Default)]
pub struct InventoryPage;

impl Presenter for InventoryPage {
    type View = DemoView;
}

/// Registry with the four demo views, each transition taking `transition`
pub fn demo_registry(transition: Duration) -> ViewRegistry {
    let mut registry = ViewRegistry::new();
    registry
        .register::<MainMenu>("Main", move || Ok(DemoView::new("Main", transition)))
        .register::<SettingsPanel>("Settings", move || Ok(DemoView::new("Settings", transition)))
        .register::<ConfirmDialog>("Confirm", move || Ok(DemoView::new("Confirm", transition)))
        .register::<InventoryPage>("Inventory", move || Ok(DemoView::new("Inventory", transition)));
    registry
}

pub fn demo_navigator(config: NavigatorConfig, transition: Duration) -> Navigator {
    Navigator::new(demo_registry(transition), DefaultInjector, config)
}

/// One line describing page, popup stack and input holder
pub fn describe(navigator: &Navigator) -> String {
    let page = navigator
        .current_page()
        .map(|page| page.name().to_string())
        .unwrap_or_else(|| "-".to_string());
    let input = navigator
        .input_holder()
        .map(|holder| holder.name().to_string())
        .unwrap_or_else(|| "-".to_string());

    format!(
        "page={} popups=[{}] input={}",
        page,
        navigator.popup_names().join(", "),
        input
    )
}

/// Walk through pages and popups, recording the state after every step
pub async fn run_script(navigator: &Navigator) -> Result<Vec<String>> {
    let mut events = navigator.subscribe();
    let mut steps = Vec::new();
    let mut record = |step: &str, navigator: &Navigator| {
        let line = format!("{:<24} {}", step, describe(navigator));
        info!("{}", line);
        steps.push(line);
    };

    navigator.change_page("Main").await?;
    record("open Main", navigator);

    let settings = navigator.show_popup("Settings")?;
    settings.shown.await?;
    record("open Settings", navigator);

    let confirm = navigator.show_popup_typed::<ConfirmDialog>("Confirm")?;
    confirm.controller.on_after_hide(|dialog| {
        info!("Confirm closed with answer {:?}", dialog.presenter().answer());
    });
    confirm.shown.await?;
    record("open Confirm", navigator);

    // Not the top popup, so nothing happens
    let hidden = navigator.hide_popup(&settings.controller).await?;
    record(
        if hidden { "hide Settings" } else { "hide Settings (ignored)" },
        navigator,
    );

    confirm.controller.presenter().choose(true);
    confirm.controller.close().await?;
    record("close Confirm", navigator);

    settings.controller.close().await?;
    record("close Settings", navigator);

    navigator.change_page("Inventory").await?;
    record("open Inventory", navigator);

    let released = navigator.shutdown();
    record("shutdown", navigator);
    info!("Released: {}", released.join(", "));

    let mut subjects = Vec::new();
    while let Ok(event) = events.try_recv() {
        debug!("Event for '{}': {:?}", event.subject(), event);
        subjects.push(event.subject().to_string());
    }
    info!("Navigation touched: {}", subjects.join(" -> "));

    Ok(steps)
}
