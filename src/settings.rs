// File: src/settings.rs
use crate::error::Result;
use crate::persistence::{Store, THEME_KEY};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }
}

/// Reads the saved theme. Missing or unreadable values fall back to the
/// default.
pub fn load_theme(store: &Store) -> Theme {
    match store.get::<Theme>(THEME_KEY) {
        Ok(theme) => theme.unwrap_or_default(),
        Err(e) => {
            log::warn!("Ignoring unreadable theme preference: {}", e);
            Theme::default()
        }
    }
}

pub fn toggle_theme(store: &Store, current: Theme) -> Result<Theme> {
    let next = current.toggled();
    store.set(THEME_KEY, &next)?;
    Ok(next)
}
