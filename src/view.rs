// File: src/view.rs
use crate::core::converter::{format_value, parse_value};
use crate::core::engine::ConverterEngine;
use crate::core::types::{Category, MultiResult, UnitDef};
use crate::error::{Error, Result};
use crate::history::HistoryEntry;
use crate::rates::RateStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Single,
    Multi,
}

/// The presentation side. Front ends implement this; the controller decides
/// what to show and when.
pub trait Renderer {
    fn category_title(&mut self, title: &str);
    fn populate_units(&mut self, category: Category, units: &[UnitDef], from: &str, to: &str);
    /// Rewrites the input field, e.g. after a negative value was coerced.
    fn render_input(&mut self, text: &str);
    /// `None` clears the output field.
    fn render_single(&mut self, value: Option<f64>);
    /// `None` empties the grid.
    fn render_multi(&mut self, results: Option<&[MultiResult]>);
    fn render_history(&mut self, entries: &[HistoryEntry]);
    /// `None` hides the indicator.
    fn rate_indicator(&mut self, message: Option<&str>);
}

/// UI state and event handling: current category, input text, unit
/// selection and view mode. Every event ends in a re-render through `R`.
pub struct ViewController<R: Renderer> {
    engine: ConverterEngine,
    renderer: R,
    category: Category,
    input: String,
    from: &'static str,
    to: &'static str,
    mode: ViewMode,
    rate_status: Option<RateStatus>,
}

impl<R: Renderer> ViewController<R> {
    pub fn new(engine: ConverterEngine, renderer: R) -> Self {
        let mut controller = Self {
            engine,
            renderer,
            category: Category::Length,
            input: String::new(),
            from: "",
            to: "",
            mode: ViewMode::Single,
            rate_status: None,
        };
        controller.reset_selection();
        controller
    }

    pub fn engine(&self) -> &ConverterEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut ConverterEngine {
        &mut self.engine
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn selection(&self) -> (&'static str, &'static str) {
        (self.from, self.to)
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    /// First full render.
    pub fn start(&mut self) {
        self.render_category();
        self.render_history();
        self.handle_conversion();
    }

    pub fn switch_category(&mut self, category: Category) {
        self.category = category;
        self.reset_selection();
        self.render_category();
        self.handle_conversion();
    }

    pub fn set_input(&mut self, text: &str) {
        self.input = text.to_string();
        self.handle_conversion();
    }

    pub fn set_from(&mut self, key: &str) -> Result<()> {
        self.from = self.resolve(key)?;
        self.handle_conversion();
        Ok(())
    }

    pub fn set_to(&mut self, key: &str) -> Result<()> {
        self.to = self.resolve(key)?;
        self.handle_conversion();
        Ok(())
    }

    pub fn swap_units(&mut self) {
        std::mem::swap(&mut self.from, &mut self.to);
        self.handle_conversion();
    }

    pub fn set_view(&mut self, mode: ViewMode) {
        self.mode = mode;
        self.handle_conversion();
    }

    pub fn clear_history(&mut self) {
        self.engine.clear_history();
        self.render_history();
    }

    /// Debounce tick. Re-renders the history when a pending entry landed.
    pub fn tick(&mut self) -> bool {
        let flushed = self.engine.poll_history();
        if flushed {
            self.render_history();
        }
        flushed
    }

    /// A failed refresh is announced once on whatever category is showing;
    /// the next category switch hides it again outside currency.
    pub fn rates_updated(&mut self, status: RateStatus) {
        let offline = status == RateStatus::Offline;
        self.rate_status = Some(status);
        if self.category == Category::Currency {
            self.render_rate_indicator();
            self.handle_conversion();
        } else if offline {
            self.renderer
                .rate_indicator(Some(&RateStatus::Offline.indicator()));
        }
    }

    fn resolve(&self, key: &str) -> Result<&'static str> {
        self.engine
            .units(self.category)
            .get(key)
            .map(|unit| unit.key)
            .ok_or_else(|| Error::UnknownUnit {
                category: self.category,
                unit: key.to_string(),
            })
    }

    fn reset_selection(&mut self) {
        let keys = self.engine.units(self.category).keys();
        self.from = keys.first().copied().unwrap_or("");
        self.to = keys.get(1).copied().unwrap_or(self.from);
    }

    fn render_category(&mut self) {
        self.renderer.category_title(&self.category.title());
        self.render_rate_indicator();
        let units = self.engine.units(self.category);
        self.renderer
            .populate_units(self.category, units.units(), self.from, self.to);
    }

    fn render_rate_indicator(&mut self) {
        let message = match &self.rate_status {
            Some(status) if self.category == Category::Currency => Some(status.indicator()),
            _ => None,
        };
        self.renderer.rate_indicator(message.as_deref());
    }

    fn render_history(&mut self) {
        let entries = self.engine.history();
        self.renderer.render_history(&entries);
    }

    fn clear_output(&mut self) {
        match self.mode {
            ViewMode::Single => self.renderer.render_single(None),
            ViewMode::Multi => self.renderer.render_multi(None),
        }
    }

    fn handle_conversion(&mut self) {
        let Some(mut value) = parse_value(&self.input) else {
            self.clear_output();
            return;
        };

        if !self.category.allows_negative() && value < 0.0 {
            value = value.abs();
            self.input = format_value(value);
            self.renderer.render_input(&self.input);
        }

        let outcome = match self.mode {
            ViewMode::Multi => self
                .engine
                .convert_all(self.category, value, self.from)
                .map(|results| self.renderer.render_multi(Some(&results))),
            ViewMode::Single => self
                .engine
                .convert_and_record(self.category, value, self.from, self.to)
                .map(|result| self.renderer.render_single(Some(result))),
        };
        if let Err(e) = outcome {
            log::warn!("Conversion failed: {}", e);
            self.clear_output();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::history::DEBOUNCE_DELAY;
    use crate::persistence::Store;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    #[derive(Default)]
    struct Recorder {
        title: String,
        units: Vec<&'static str>,
        input: Option<String>,
        single: Option<f64>,
        multi: Option<Vec<(String, f64, bool)>>,
        history: Vec<HistoryEntry>,
        indicator: Option<String>,
        single_calls: usize,
    }

    impl Renderer for Recorder {
        fn category_title(&mut self, title: &str) {
            self.title = title.to_string();
        }
        fn populate_units(&mut self, _category: Category, units: &[UnitDef], _from: &str, _to: &str) {
            self.units = units.iter().map(|u| u.key).collect();
        }
        fn render_input(&mut self, text: &str) {
            self.input = Some(text.to_string());
        }
        fn render_single(&mut self, value: Option<f64>) {
            self.single_calls += 1;
            self.single = value;
        }
        fn render_multi(&mut self, results: Option<&[MultiResult]>) {
            self.multi = results.map(|rs| {
                rs.iter()
                    .map(|r| (r.label.to_string(), r.value, r.is_source))
                    .collect()
            });
        }
        fn render_history(&mut self, entries: &[HistoryEntry]) {
            self.history = entries.to_vec();
        }
        fn rate_indicator(&mut self, message: Option<&str>) {
            self.indicator = message.map(str::to_string);
        }
    }

    fn controller(dir: &std::path::Path) -> (ViewController<Recorder>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 4, 4, 9, 30, 0).unwrap(),
        ));
        let engine = ConverterEngine::new(Store::open(dir).unwrap(), clock.clone());
        let mut vc = ViewController::new(engine, Recorder::default());
        vc.start();
        (vc, clock)
    }

    #[test]
    fn test_start_renders_length_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let (vc, _clock) = controller(dir.path());
        assert_eq!(vc.renderer().title, "Length Converter");
        assert_eq!(vc.renderer().units.len(), 8);
        assert_eq!(vc.selection(), ("m", "km"));
        assert_eq!(vc.renderer().single, None);
    }

    #[test]
    fn test_single_conversion_and_debounced_history() {
        let dir = tempfile::tempdir().unwrap();
        let (mut vc, clock) = controller(dir.path());
        vc.set_to("cm").unwrap();
        vc.set_input("1");
        vc.set_input("12");
        assert_eq!(vc.renderer().single, Some(1200.0));

        assert!(!vc.tick());
        clock.advance(DEBOUNCE_DELAY);
        assert!(vc.tick());
        assert_eq!(vc.renderer().history.len(), 1);
        assert_eq!(vc.renderer().history[0].input_value, 12.0);
    }

    #[test]
    fn test_non_numeric_input_clears_output_without_history() {
        let dir = tempfile::tempdir().unwrap();
        let (mut vc, clock) = controller(dir.path());
        vc.set_input("3");
        vc.engine_mut().clear_history();
        vc.set_input("abc");
        assert_eq!(vc.renderer().single, None);
        clock.advance(DEBOUNCE_DELAY);
        assert!(!vc.tick());
    }

    #[test]
    fn test_negative_input_rewritten_outside_temperature() {
        let dir = tempfile::tempdir().unwrap();
        let (mut vc, _clock) = controller(dir.path());
        vc.set_input("-5");
        assert_eq!(vc.renderer().input.as_deref(), Some("5"));
        assert_eq!(vc.input(), "5");

        vc.switch_category(Category::Temperature);
        vc.set_input("-40");
        vc.set_to("f").unwrap();
        assert_eq!(vc.renderer().single, Some(-40.0));
        assert_eq!(vc.input(), "-40");
    }

    #[test]
    fn test_swap_and_multi_view() {
        let dir = tempfile::tempdir().unwrap();
        let (mut vc, _clock) = controller(dir.path());
        vc.switch_category(Category::Time);
        vc.set_from("h").unwrap();
        vc.set_to("min").unwrap();
        vc.set_input("2");
        assert_eq!(vc.renderer().single, Some(120.0));

        vc.swap_units();
        assert_eq!(vc.selection(), ("min", "h"));
        assert_eq!(vc.renderer().single, Some(0.033333));

        vc.set_view(ViewMode::Multi);
        let grid = vc.renderer().multi.clone().unwrap();
        assert_eq!(grid.len(), 7);
        assert!(grid.iter().any(|(label, value, source)| label == "Minutes" && *value == 2.0 && *source));
        assert!(grid.iter().any(|(label, value, _)| label == "Seconds" && *value == 120.0));
    }

    #[test]
    fn test_multi_view_never_records_history() {
        let dir = tempfile::tempdir().unwrap();
        let (mut vc, clock) = controller(dir.path());
        vc.set_view(ViewMode::Multi);
        vc.set_input("10");
        clock.advance(DEBOUNCE_DELAY);
        assert!(!vc.tick());
        assert!(vc.renderer().history.is_empty());
    }

    #[test]
    fn test_unknown_unit_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (mut vc, _clock) = controller(dir.path());
        assert!(vc.set_from("usd").is_err());
        assert_eq!(vc.selection(), ("m", "km"));
    }

    #[test]
    fn test_rate_indicator_visibility() {
        let dir = tempfile::tempdir().unwrap();
        let (mut vc, _clock) = controller(dir.path());
        let at = Utc.with_ymd_and_hms(2026, 4, 4, 9, 0, 0).unwrap();

        vc.rates_updated(RateStatus::Live { updated_at: at });
        assert_eq!(vc.renderer().indicator, None);

        vc.switch_category(Category::Currency);
        assert!(vc.renderer().indicator.as_deref().unwrap().starts_with("Rates updated: "));

        vc.switch_category(Category::Area);
        assert_eq!(vc.renderer().indicator, None);

        vc.rates_updated(RateStatus::Offline);
        assert_eq!(vc.renderer().indicator.as_deref(), Some("Using offline rates"));

        vc.switch_category(Category::Weight);
        assert_eq!(vc.renderer().indicator, None);

        vc.switch_category(Category::Currency);
        assert_eq!(vc.renderer().indicator.as_deref(), Some("Using offline rates"));
    }

    #[test]
    fn test_overflowing_input_clears_output() {
        let dir = tempfile::tempdir().unwrap();
        let (mut vc, clock) = controller(dir.path());
        vc.switch_category(Category::Weight);
        vc.set_to("mg").unwrap();
        vc.set_input("2");
        assert_eq!(vc.renderer().single, Some(2_000_000.0));

        vc.set_input("1e303");
        assert_eq!(vc.renderer().single, None);
        vc.set_view(ViewMode::Multi);
        assert_eq!(vc.renderer().multi, None);

        clock.advance(DEBOUNCE_DELAY);
        vc.tick();
        assert!(vc.renderer().history.iter().all(|e| e.output_value.is_finite()));
    }
}
