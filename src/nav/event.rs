use serde::{Deserialize, Serialize};

/// Notification of a completed navigation step.
///
/// Sent only after the step's transition finished; receivers that lag
/// behind lose the oldest events rather than slowing navigation down.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NavEvent {
    /// A new page finished showing
    PageChanged { from: Option<String>, to: String },

    /// A popup finished showing; `depth` is its 1-based stack position
    PopupOpened { name: String, depth: usize },

    /// A popup was hidden and removed; `depth` is the stack size afterwards
    PopupClosed { name: String, depth: usize },
}

impl NavEvent {
    /// Name of the surface the event is about
    pub fn subject(&self) -> &str {
        match self {
            NavEvent::PageChanged { to, .. } => to,
            NavEvent::PopupOpened { name, .. } | NavEvent::PopupClosed { name, .. } => name,
        }
    }
}
