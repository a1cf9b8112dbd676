use serde::{Deserialize, Serialize};

pub const MIN_PANEL_WIDTH: u32 = 200;
pub const MAX_PANEL_WIDTH: u32 = 800;

/// Persisted panel arrangement of the player screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PanelLayout {
    pub sidebar_width: u32,
    pub notes_width: u32,
    pub sidebar_collapsed: bool,
    pub notes_open: bool,
}

impl Default for PanelLayout {
    fn default() -> Self {
        Self {
            sidebar_width: 280,
            notes_width: 320,
            sidebar_collapsed: false,
            notes_open: false,
        }
    }
}

impl PanelLayout {
    /// Clamp widths into `[MIN_PANEL_WIDTH, MAX_PANEL_WIDTH]`.
    #[must_use]
    pub fn clamped(self) -> Self {
        Self {
            sidebar_width: self.sidebar_width.clamp(MIN_PANEL_WIDTH, MAX_PANEL_WIDTH),
            notes_width: self.notes_width.clamp(MIN_PANEL_WIDTH, MAX_PANEL_WIDTH),
            ..self
        }
    }
}
