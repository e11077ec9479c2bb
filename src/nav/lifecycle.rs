use serde::{Deserialize, Serialize};

/// Transition state of a controller and its surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Not visible, input disabled
    Hidden,

    /// Transition-in running, input disabled
    Showing,

    /// Visible; may hold input if it is the topmost surface
    Shown,

    /// Transition-out running, input disabled
    Hiding,
}

impl Phase {
    /// Whether a Show may start from this phase
    pub fn can_show(self) -> bool {
        matches!(self, Phase::Hidden | Phase::Shown)
    }

    /// Whether a Hide may start from this phase (Showing is waited out first)
    pub fn can_hide(self) -> bool {
        matches!(self, Phase::Hidden | Phase::Shown)
    }
}

impl Default for Phase {
    fn default() -> Self {
        Phase::Hidden
    }
}

/// What to do with a page change that was requested while another one was
/// still pending
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageChangePolicy {
    /// Only the newest pending request runs; older ones that have not
    /// started finish as superseded
    Supersede,

    /// Every request runs, in the order it acquires the page slot
    Sequential,
}

impl Default for PageChangePolicy {
    fn default() -> Self {
        PageChangePolicy::Supersede
    }
}
