// File: src/config.rs
use crate::error::{Error, Result};
use crate::rates::DEFAULT_RATES_URL;
use std::path::PathBuf;

const APP_DIR: &str = "smart-unit-converter";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub rates_url: String,
    /// Skip the network and run on cached or built-in rates.
    pub offline: bool,
}

impl Config {
    /// Platform defaults, overridden by `UNITS_DATA_DIR`, `UNITS_RATES_URL`
    /// and `UNITS_OFFLINE`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let data_dir = match lookup("UNITS_DATA_DIR").filter(|s| !s.is_empty()) {
            Some(dir) => PathBuf::from(dir),
            None => default_data_dir()?,
        };
        let rates_url = lookup("UNITS_RATES_URL")
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_RATES_URL.to_string());
        let offline = lookup("UNITS_OFFLINE")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        Ok(Self {
            data_dir,
            rates_url,
            offline,
        })
    }

    /// Applies command-line overrides on top of the environment.
    pub fn with_overrides(
        mut self,
        data_dir: Option<PathBuf>,
        rates_url: Option<String>,
        offline: bool,
    ) -> Self {
        if let Some(dir) = data_dir {
            self.data_dir = dir;
        }
        if let Some(url) = rates_url {
            self.rates_url = url;
        }
        self.offline |= offline;
        self
    }
}

fn default_data_dir() -> Result<PathBuf> {
    let mut path = dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .ok_or(Error::NoDataDir)?;
    path.push(APP_DIR);
    Ok(path)
}
