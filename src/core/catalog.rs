// File: src/core/catalog.rs
use crate::core::types::{Category, UnitDef};
use crate::error::{Error, Result};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

const LENGTH: &[UnitDef] = &[
    UnitDef::new("m", "Meters", 1.0),
    UnitDef::new("km", "Kilometers", 0.001),
    UnitDef::new("cm", "Centimeters", 100.0),
    UnitDef::new("mm", "Millimeters", 1000.0),
    UnitDef::new("in", "Inches", 39.3701),
    UnitDef::new("ft", "Feet", 3.28084),
    UnitDef::new("yd", "Yards", 1.09361),
    UnitDef::new("mi", "Miles", 0.000621371),
];

const WEIGHT: &[UnitDef] = &[
    UnitDef::new("kg", "Kilograms", 1.0),
    UnitDef::new("g", "Grams", 1000.0),
    UnitDef::new("mg", "Milligrams", 1_000_000.0),
    UnitDef::new("lb", "Pounds", 2.20462),
    UnitDef::new("oz", "Ounces", 35.274),
    UnitDef::new("st", "Stone", 0.157473),
];

// No rate table: conversions go through fixed formulas.
const TEMPERATURE: &[UnitDef] = &[
    UnitDef::formula("c", "Celsius"),
    UnitDef::formula("f", "Fahrenheit"),
    UnitDef::formula("k", "Kelvin"),
];

const AREA: &[UnitDef] = &[
    UnitDef::new("sqm", "Square Meters", 1.0),
    UnitDef::new("sqkm", "Square Kilometers", 0.000001),
    UnitDef::new("sqft", "Square Feet", 10.7639),
    UnitDef::new("sqin", "Square Inches", 1550.0),
    UnitDef::new("ac", "Acres", 0.000247105),
    UnitDef::new("ha", "Hectares", 0.0001),
];

/// Seconds per unit. `mo` is a fixed 30.4-day approximation.
const TIME: &[UnitDef] = &[
    UnitDef::new("s", "Seconds", 1.0),
    UnitDef::new("min", "Minutes", 60.0),
    UnitDef::new("h", "Hours", 3600.0),
    UnitDef::new("d", "Days", 86400.0),
    UnitDef::new("wk", "Weeks", 604800.0),
    UnitDef::new("mo", "Months", 2628000.0),
    UnitDef::new("y", "Years", 31536000.0),
];

/// Static fallback rates, units per one US dollar.
pub const DEFAULT_CURRENCY: &[UnitDef] = &[
    UnitDef::new("usd", "US Dollar ($)", 1.0),
    UnitDef::new("eur", "Euro (€)", 0.92),
    UnitDef::new("gbp", "British Pound (£)", 0.79),
    UnitDef::new("jpy", "Japanese Yen (¥)", 151.5),
    UnitDef::new("inr", "Indian Rupee (₹)", 83.5),
    UnitDef::new("cad", "Canadian Dollar (C$)", 1.36),
    UnitDef::new("aud", "Australian Dollar (A$)", 1.52),
    UnitDef::new("cny", "Chinese Yuan (¥)", 7.23),
];

fn base_unit(category: Category) -> Option<&'static str> {
    match category {
        Category::Length => Some("m"),
        Category::Weight => Some("kg"),
        Category::Temperature => None,
        Category::Area => Some("sqm"),
        Category::Time => Some("s"),
        Category::Currency => Some("usd"),
    }
}

/// A snapshot of one category's units, in display order.
#[derive(Debug, Clone)]
pub struct UnitSet {
    pub category: Category,
    pub base: Option<&'static str>,
    units: Vec<UnitDef>,
}

impl UnitSet {
    pub fn keys(&self) -> Vec<&'static str> {
        self.units.iter().map(|u| u.key).collect()
    }

    pub fn units(&self) -> &[UnitDef] {
        &self.units
    }

    pub fn get(&self, key: &str) -> Option<&UnitDef> {
        self.units.iter().find(|u| u.key == key)
    }

    pub fn label_of(&self, key: &str) -> Option<&'static str> {
        self.get(key).map(|u| u.label)
    }

    /// Always `None` for temperature.
    pub fn rate_of(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(|u| u.rate)
    }

    pub(crate) fn require(&self, key: &str) -> Result<&UnitDef> {
        self.get(key).ok_or_else(|| Error::UnknownUnit {
            category: self.category,
            unit: key.to_string(),
        })
    }
}

/// The unit registry. Every table is static except currency, which the
/// rate updater may replace through the [`RatesWriter`] handed out by
/// [`Catalog::new`].
#[derive(Clone)]
pub struct Catalog {
    currency: Arc<RwLock<Vec<UnitDef>>>,
}

/// Sole write capability over the catalog's currency rates.
pub struct RatesWriter {
    currency: Arc<RwLock<Vec<UnitDef>>>,
}

impl Catalog {
    pub fn new() -> (Catalog, RatesWriter) {
        let currency = Arc::new(RwLock::new(DEFAULT_CURRENCY.to_vec()));
        (
            Catalog { currency: Arc::clone(&currency) },
            RatesWriter { currency },
        )
    }

    pub fn units(&self, category: Category) -> UnitSet {
        let units = match category {
            Category::Length => LENGTH.to_vec(),
            Category::Weight => WEIGHT.to_vec(),
            Category::Temperature => TEMPERATURE.to_vec(),
            Category::Area => AREA.to_vec(),
            Category::Time => TIME.to_vec(),
            Category::Currency => self.currency.read().clone(),
        };
        UnitSet {
            category,
            base: base_unit(category),
            units,
        }
    }
}

impl RatesWriter {
    /// Merges a rate mapping keyed by upper-case ISO codes into the currency
    /// table. Codes that are missing, or whose rate is not a finite positive
    /// number, keep the rate currently loaded. Returns the merged mapping,
    /// keyed the same way, for caching.
    pub fn merge(&self, incoming: &HashMap<String, f64>) -> BTreeMap<String, f64> {
        let mut table = self.currency.write();
        let mut merged = BTreeMap::new();
        for unit in table.iter_mut() {
            let code = unit.key.to_ascii_uppercase();
            match incoming.get(&code) {
                Some(&rate) if rate.is_finite() && rate > 0.0 => unit.rate = Some(rate),
                _ => log::debug!("Rate for {} missing from source, keeping {:?}", code, unit.rate),
            }
            if let Some(rate) = unit.rate {
                merged.insert(code, rate);
            }
        }
        merged
    }
}
