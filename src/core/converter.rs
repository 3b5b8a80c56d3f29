// File: src/core/converter.rs
use crate::core::catalog::UnitSet;
use crate::core::types::{Category, ConversionRule, UnitDef};
use crate::error::{Error, Result};

const DECIMALS: i32 = 6;
const KELVIN_OFFSET: f64 = 273.15;

/// Stateless conversion rules. Rates are read from the `UnitSet` snapshot
/// passed in, never from shared state.
pub struct UnitConverter;

impl UnitConverter {
    pub fn new() -> Self {
        Self
    }

    /// Sign policy, rule dispatch and 6-decimal rounding. A result that
    /// overflows f64 is an error, never an infinite value.
    pub fn convert(&self, units: &UnitSet, value: f64, from: &str, to: &str) -> Result<f64> {
        let value = normalize_sign(units.category, value);
        let result = self.convert_raw(units, value, from, to)?;
        if !result.is_finite() {
            return Err(Error::OutOfRange {
                category: units.category,
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        Ok(round_to_precision(result))
    }

    /// The bare rule, without sign coercion or rounding.
    pub fn convert_raw(&self, units: &UnitSet, value: f64, from: &str, to: &str) -> Result<f64> {
        let from_unit = units.require(from)?;
        let to_unit = units.require(to)?;

        if from == to {
            return Ok(value);
        }

        match units.category.rule() {
            ConversionRule::PerBase => Ok((value / rate(units, from_unit)?) * rate(units, to_unit)?),
            ConversionRule::BasePer => Ok((value * rate(units, from_unit)?) / rate(units, to_unit)?),
            ConversionRule::Temperature => {
                let celsius = to_celsius(value, from).ok_or_else(|| unknown(units, from))?;
                from_celsius(celsius, to).ok_or_else(|| unknown(units, to))
            }
        }
    }
}

impl Default for UnitConverter {
    fn default() -> Self {
        Self::new()
    }
}

fn unknown(units: &UnitSet, key: &str) -> Error {
    Error::UnknownUnit {
        category: units.category,
        unit: key.to_string(),
    }
}

fn rate(units: &UnitSet, unit: &UnitDef) -> Result<f64> {
    unit.rate.ok_or_else(|| unknown(units, unit.key))
}

fn to_celsius(value: f64, from: &str) -> Option<f64> {
    match from {
        "c" => Some(value),
        "f" => Some((value - 32.0) * 5.0 / 9.0),
        "k" => Some(value - KELVIN_OFFSET),
        _ => None,
    }
}

fn from_celsius(celsius: f64, to: &str) -> Option<f64> {
    match to {
        "c" => Some(celsius),
        "f" => Some(celsius * 9.0 / 5.0 + 32.0),
        "k" => Some(celsius + KELVIN_OFFSET),
        _ => None,
    }
}

/// Negative inputs become their absolute value everywhere but temperature.
pub fn normalize_sign(category: Category, value: f64) -> f64 {
    if !category.allows_negative() && value < 0.0 {
        value.abs()
    } else {
        value
    }
}

/// Rounds to 6 decimal places. Values too large to carry six decimals in an
/// f64 are returned as-is; negative zero collapses to zero.
pub fn round_to_precision(value: f64) -> f64 {
    let factor = 10f64.powi(DECIMALS);
    let scaled = value * factor;
    if !scaled.is_finite() || scaled.abs() >= 1e15 {
        return value;
    }
    let rounded = scaled.round() / factor;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Shortest representation, no forced trailing zeros ("100", "0.000621").
pub fn format_value(value: f64) -> String {
    format!("{}", value)
}

/// Parses the leading number of `text`: leading whitespace is skipped and
/// anything after the longest numeric prefix is ignored ("12px" is 12).
/// Returns `None` when there is no numeric prefix or the value is not finite.
pub fn parse_value(text: &str) -> Option<f64> {
    let s = text.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first().copied(), Some(b'+') | Some(b'-')) {
        end = 1;
    }

    let mut seen_digit = false;
    let mut seen_dot = false;
    while end < bytes.len() {
        match bytes[end] {
            b'0'..=b'9' => seen_digit = true,
            b'.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end += 1;
    }
    if !seen_digit {
        return None;
    }

    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end).copied(), Some(b'+') | Some(b'-')) {
            exp_end += 1;
        }
        let digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > digits_start {
            end = exp_end;
        }
    }

    s[..end].parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::Catalog;

    fn convert(category: Category, value: f64, from: &str, to: &str) -> f64 {
        let (catalog, _writer) = Catalog::new();
        UnitConverter::new()
            .convert(&catalog.units(category), value, from, to)
            .unwrap()
    }

    fn convert_raw(category: Category, value: f64, from: &str, to: &str) -> f64 {
        let (catalog, _writer) = Catalog::new();
        UnitConverter::new()
            .convert_raw(&catalog.units(category), value, from, to)
            .unwrap()
    }

    #[test]
    fn test_standard_rule() {
        assert_eq!(convert(Category::Length, 1.0, "m", "cm"), 100.0);
        assert_eq!(convert(Category::Length, 100.0, "cm", "m"), 1.0);
        assert_eq!(convert(Category::Weight, 1.0, "kg", "g"), 1000.0);
    }

    #[test]
    fn test_time_rule_uses_inverse_rates() {
        assert_eq!(convert(Category::Time, 1.0, "h", "min"), 60.0);
        assert_eq!(convert(Category::Time, 120.0, "min", "h"), 2.0);
        assert_eq!(convert(Category::Time, 1.0, "d", "h"), 24.0);
    }

    #[test]
    fn test_temperature_formulas() {
        assert_eq!(convert(Category::Temperature, 0.0, "c", "f"), 32.0);
        assert_eq!(convert(Category::Temperature, 212.0, "f", "c"), 100.0);
        assert_eq!(convert(Category::Temperature, 0.0, "c", "k"), 273.15);
        assert_eq!(convert(Category::Temperature, -40.0, "f", "c"), -40.0);
    }

    #[test]
    fn test_identity_is_exact() {
        assert_eq!(convert_raw(Category::Temperature, -17.3, "f", "f"), -17.3);
        assert_eq!(convert_raw(Category::Length, 0.1, "ft", "ft"), 0.1);
        assert_eq!(convert_raw(Category::Time, 7.7, "mo", "mo"), 7.7);
    }

    #[test]
    fn test_round_trip_law() {
        let (catalog, _writer) = Catalog::new();
        let converter = UnitConverter::new();
        for category in Category::ALL {
            let set = catalog.units(category);
            for from in set.keys() {
                for to in set.keys() {
                    for x in [0.0, 1.0, 12.5, 987.654] {
                        let there = converter.convert_raw(&set, x, from, to).unwrap();
                        let back = converter.convert_raw(&set, there, to, from).unwrap();
                        assert!(
                            (back - x).abs() <= 1e-6 * x.max(1.0),
                            "{} {} -> {} -> {}: {}",
                            category,
                            x,
                            from,
                            to,
                            back
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_negative_input_coerced_except_temperature() {
        assert_eq!(
            convert(Category::Length, -5.0, "cm", "m"),
            convert(Category::Length, 5.0, "cm", "m")
        );
        assert_eq!(convert(Category::Temperature, -10.0, "c", "c"), -10.0);
        assert_eq!(convert(Category::Temperature, -273.15, "c", "k"), 0.0);
    }

    #[test]
    fn test_unknown_unit_is_an_error() {
        let (catalog, _writer) = Catalog::new();
        let err = UnitConverter::new()
            .convert(&catalog.units(Category::Length), 1.0, "m", "parsec")
            .unwrap_err();
        assert!(matches!(err, Error::UnknownUnit { category: Category::Length, .. }));
    }

    #[test]
    fn test_overflowing_result_is_an_error() {
        let (catalog, _writer) = Catalog::new();
        let converter = UnitConverter::new();
        let weight = catalog.units(Category::Weight);
        let err = converter.convert(&weight, 1e303, "kg", "mg").unwrap_err();
        assert!(matches!(err, Error::OutOfRange { category: Category::Weight, .. }));
        assert!(converter.convert(&weight, 1e303, "mg", "kg").unwrap().is_finite());
    }

    #[test]
    fn test_rounding_and_formatting() {
        assert_eq!(round_to_precision(0.1234564), 0.123456);
        assert_eq!(round_to_precision(-0.0000001), 0.0);
        assert_eq!(format_value(convert(Category::Length, 1.0, "m", "mi")), "0.000621");
        assert_eq!(format_value(100.0), "100");
        assert_eq!(format_value(273.15), "273.15");
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("42"), Some(42.0));
        assert_eq!(parse_value("  -3.5e2kg"), Some(-350.0));
        assert_eq!(parse_value("12px"), Some(12.0));
        assert_eq!(parse_value(".5"), Some(0.5));
        assert_eq!(parse_value("7e"), Some(7.0));
        assert_eq!(parse_value(""), None);
        assert_eq!(parse_value("abc"), None);
        assert_eq!(parse_value("-"), None);
        assert_eq!(parse_value("1e999"), None);
    }
}
