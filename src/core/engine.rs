use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::core::catalog::{Catalog, RatesWriter, UnitSet};
use crate::core::converter::{normalize_sign, UnitConverter};
use crate::core::types::{Category, MultiResult};
use crate::error::Result;
use crate::history::{HistoryEntry, HistoryLog, PendingConversion};
use crate::persistence::Store;
use crate::rates::RateUpdater;
use crate::settings::{load_theme, toggle_theme, Theme};
use std::sync::Arc;

/// The converter engine is composed of the catalog, the history log and the
/// store they persist to. Currency rates are written elsewhere, through the
/// `RateUpdater` handed out by `rate_updater`.
pub struct ConverterEngine {
    catalog: Catalog,
    converter: UnitConverter,
    history: HistoryLog,
    store: Store,
    clock: Arc<dyn Clock>,
    theme: Theme,
    rates_writer: Option<RatesWriter>,
}

impl ConverterEngine {
    pub fn new(store: Store, clock: Arc<dyn Clock>) -> Self {
        let (catalog, writer) = Catalog::new();
        let history = HistoryLog::load(store.clone());
        let theme = load_theme(&store);
        Self {
            catalog,
            converter: UnitConverter::new(),
            history,
            store,
            clock,
            theme,
            rates_writer: Some(writer),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let store = Store::open(&config.data_dir)?;
        Ok(Self::new(store, Arc::new(SystemClock)))
    }

    /// Hands out the only currency-rate writer. `None` after the first call.
    pub fn rate_updater(&mut self) -> Option<RateUpdater> {
        let writer = self.rates_writer.take()?;
        Some(RateUpdater::new(writer, self.store.clone(), Arc::clone(&self.clock)))
    }

    pub fn units(&self, category: Category) -> UnitSet {
        self.catalog.units(category)
    }

    /// Converts with the sign policy applied and the result rounded to six
    /// decimals.
    pub fn convert(&self, category: Category, value: f64, from: &str, to: &str) -> Result<f64> {
        self.converter.convert(&self.units(category), value, from, to)
    }

    /// Every unit of `category` as a target, in catalog order.
    pub fn convert_all(&self, category: Category, value: f64, from: &str) -> Result<Vec<MultiResult>> {
        let units = self.units(category);
        units
            .units()
            .iter()
            .map(|unit| {
                Ok(MultiResult {
                    key: unit.key,
                    label: unit.label,
                    value: self.converter.convert(&units, value, from, unit.key)?,
                    is_source: unit.key == from,
                })
            })
            .collect()
    }

    /// Converts and queues the conversion for the history log. The entry is
    /// only written once input has been quiet for the debounce delay.
    pub fn convert_and_record(
        &mut self,
        category: Category,
        value: f64,
        from: &str,
        to: &str,
    ) -> Result<f64> {
        let units = self.units(category);
        let input = normalize_sign(category, value);
        let output = self.converter.convert(&units, input, from, to)?;
        let label = |key: &str| units.label_of(key).unwrap_or(key).to_string();
        self.history.record(
            PendingConversion {
                input_value: input,
                input_unit: label(from),
                output_value: output,
                output_unit: label(to),
                category,
            },
            self.clock.now_millis(),
        );
        Ok(output)
    }

    /// Flushes a due history write. Returns true if the log changed.
    pub fn poll_history(&mut self) -> bool {
        self.history.poll(self.clock.now())
    }

    pub fn history(&self) -> Vec<HistoryEntry> {
        self.history.get_all()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn toggle_theme(&mut self) -> Result<Theme> {
        self.theme = toggle_theme(&self.store, self.theme)?;
        Ok(self.theme)
    }
}
