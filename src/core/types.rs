// src/core/types.rs
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A conversion domain. The set is closed: every category has exactly one
/// conversion rule, fixed at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Length,
    Weight,
    Temperature,
    Area,
    Time,
    Currency,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Length,
        Category::Weight,
        Category::Temperature,
        Category::Area,
        Category::Time,
        Category::Currency,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Category::Length => "length",
            Category::Weight => "weight",
            Category::Temperature => "temperature",
            Category::Area => "area",
            Category::Time => "time",
            Category::Currency => "currency",
        }
    }

    /// Display label, e.g. "Length".
    pub fn label(self) -> String {
        capitalize(self.key())
    }

    pub fn title(self) -> String {
        format!("{} Converter", self.label())
    }

    /// Physical quantities other than temperature cannot be negative.
    pub fn allows_negative(self) -> bool {
        self == Category::Temperature
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown category '{0}'")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.key() == lowered)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// Upper-cases the first character, leaves the rest alone.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// One unit of a category. Key, label and rate live together so the rate
/// and label mappings can never disagree on their key sets.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitDef {
    pub key: &'static str,
    pub label: &'static str,
    /// `None` for units converted by formula rather than rate table.
    pub rate: Option<f64>,
}

impl UnitDef {
    pub const fn new(key: &'static str, label: &'static str, rate: f64) -> Self {
        Self { key, label, rate: Some(rate) }
    }

    pub const fn formula(key: &'static str, label: &'static str) -> Self {
        Self { key, label, rate: None }
    }
}

/// The three conversion rules. Rate direction is part of the variant, so a
/// seconds-per-unit table can never be fed to the units-per-base formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionRule {
    /// Rates are "units of this type per one base unit" (1 m = 100 cm).
    PerBase,
    /// Rates are "base units per one unit of this type" (1 min = 60 s).
    BasePer,
    /// Piecewise formulas through Celsius.
    Temperature,
}

impl Category {
    pub fn rule(self) -> ConversionRule {
        match self {
            Category::Length | Category::Weight | Category::Area | Category::Currency => {
                ConversionRule::PerBase
            }
            Category::Time => ConversionRule::BasePer,
            Category::Temperature => ConversionRule::Temperature,
        }
    }
}

/// A single cell of the multi-target view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultiResult {
    pub key: &'static str,
    pub label: &'static str,
    pub value: f64,
    pub is_source: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parse_is_case_insensitive() {
        assert_eq!("Time".parse::<Category>(), Ok(Category::Time));
        assert_eq!(" currency ".parse::<Category>(), Ok(Category::Currency));
        assert!("volume".parse::<Category>().is_err());
    }

    #[test]
    fn test_category_title() {
        assert_eq!(Category::Temperature.title(), "Temperature Converter");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_rule_selection() {
        assert_eq!(Category::Length.rule(), ConversionRule::PerBase);
        assert_eq!(Category::Currency.rule(), ConversionRule::PerBase);
        assert_eq!(Category::Time.rule(), ConversionRule::BasePer);
        assert_eq!(Category::Temperature.rule(), ConversionRule::Temperature);
    }
}
