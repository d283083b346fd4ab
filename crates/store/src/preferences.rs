//! UI preferences persisted alongside workflow data.

use std::sync::Arc;

use crate::json::{load_json, save_json};
use crate::keys::PANEL_WIDTH_KEY;
use crate::kv::KvStore;

/// Sidebar width in pixels used when nothing valid is stored.
pub const DEFAULT_PANEL_WIDTH: u32 = 300;

/// Reads and writes the workflow sidebar width.
///
/// Widths are pixels.  Terminal front-ends convert to columns at render
/// time rather than storing a different unit under the same key.
pub struct PanelPreferences {
    store: Arc<dyn KvStore>,
}

impl PanelPreferences {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Stored panel width in pixels, or [`DEFAULT_PANEL_WIDTH`] when the
    /// value is absent, unparseable, or not positive.
    pub fn width(&self) -> u32 {
        load_json::<i64>(self.store.as_ref(), PANEL_WIDTH_KEY)
            .and_then(|w| u32::try_from(w).ok())
            .filter(|&w| w > 0)
            .unwrap_or(DEFAULT_PANEL_WIDTH)
    }

    /// Persist a new panel width.  Zero is ignored.
    pub fn set_width(&self, width: u32) {
        if width == 0 {
            tracing::debug!("Ignoring zero panel width");
            return;
        }
        save_json(self.store.as_ref(), PANEL_WIDTH_KEY, &width);
    }
}
