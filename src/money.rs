//! Human-readable magnitude parsing ("10m", "1.5b") and formatting

use serde::{Deserialize, Serialize};

/// Raw magnitude as it arrives from JSON bodies or query strings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MagnitudeInput {
    Number(f64),
    Text(String),
}

impl From<f64> for MagnitudeInput {
    fn from(value: f64) -> Self {
        MagnitudeInput::Number(value)
    }
}

impl From<&str> for MagnitudeInput {
    fn from(value: &str) -> Self {
        MagnitudeInput::Text(value.to_string())
    }
}

impl From<String> for MagnitudeInput {
    fn from(value: String) -> Self {
        MagnitudeInput::Text(value)
    }
}

/// Parse a magnitude into a plain quantity.
///
/// Never fails: anything that is not a finite number or a
/// `<digits>(.<digits>)?[kmbt]` string yields `None`.
pub fn parse_magnitude(input: Option<&MagnitudeInput>) -> Option<f64> {
    match input? {
        MagnitudeInput::Number(n) => n.is_finite().then_some(*n),
        MagnitudeInput::Text(s) => parse_magnitude_str(s),
    }
}

/// String form of [`parse_magnitude`]
pub fn parse_magnitude_str(input: &str) -> Option<f64> {
    let raw = input.trim().to_lowercase();
    if raw.is_empty() {
        return None;
    }

    if let Some(value) = parse_suffixed(&raw) {
        return Some(value);
    }

    raw.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Parse a textual per-second rate such as `"$1.5m/s"`
pub fn parse_rate_text(input: &str) -> Option<f64> {
    let trimmed = input.trim();
    let without_unit = strip_suffix_ci(trimmed, "/s").unwrap_or(trimmed);
    let cleaned = without_unit.strip_prefix('$').unwrap_or(without_unit);
    parse_magnitude_str(cleaned)
}

fn strip_suffix_ci<'a>(s: &'a str, suffix: &str) -> Option<&'a str> {
    if s.len() >= suffix.len() && s.is_char_boundary(s.len() - suffix.len()) {
        let (head, tail) = s.split_at(s.len() - suffix.len());
        if tail.eq_ignore_ascii_case(suffix) {
            return Some(head);
        }
    }
    None
}

fn parse_suffixed(raw: &str) -> Option<f64> {
    let multiplier = match raw.chars().last()? {
        'k' => 1e3,
        'm' => 1e6,
        'b' => 1e9,
        't' => 1e12,
        _ => return None,
    };
    let number = &raw[..raw.len() - 1];
    if !is_plain_decimal(number) {
        return None;
    }
    number.parse::<f64>().ok().map(|n| n * multiplier)
}

/// `<digits>` or `<digits>.<digits>`, nothing else
fn is_plain_decimal(s: &str) -> bool {
    let mut parts = s.splitn(2, '.');
    let int_part = parts.next().unwrap_or_default();
    let all_digits = |p: &str| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit());
    match parts.next() {
        Some(frac) => all_digits(int_part) && all_digits(frac),
        None => all_digits(int_part),
    }
}

/// Compact rendering used in notification rows: `1.5M`, `750K`, `2B`
pub fn format_human(n: f64) -> String {
    let (scaled, suffix) = if n >= 1e12 {
        (n / 1e12, "T")
    } else if n >= 1e9 {
        (n / 1e9, "B")
    } else if n >= 1e6 {
        (n / 1e6, "M")
    } else if n >= 1e3 {
        (n / 1e3, "K")
    } else {
        (n, "")
    };
    format!("{}{}", trim_decimals(scaled), suffix)
}

fn trim_decimals(n: f64) -> String {
    let fixed = format!("{:.3}", n);
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    if trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Option<f64> {
        parse_magnitude(Some(&MagnitudeInput::from(s)))
    }

    #[test]
    fn test_suffixed_magnitudes() {
        assert_eq!(text("10m"), Some(10_000_000.0));
        assert_eq!(text("1.5b"), Some(1_500_000_000.0));
        assert_eq!(text("750k"), Some(750_000.0));
        assert_eq!(text("2t"), Some(2_000_000_000_000.0));
    }

    #[test]
    fn test_suffix_is_case_insensitive_and_trimmed() {
        assert_eq!(text("  2.5M "), Some(2_500_000.0));
        assert_eq!(text("3K"), Some(3_000.0));
    }

    #[test]
    fn test_plain_numbers() {
        assert_eq!(text("1234"), Some(1234.0));
        assert_eq!(text("0.5"), Some(0.5));
        assert_eq!(parse_magnitude(Some(&MagnitudeInput::Number(42.0))), Some(42.0));
    }

    #[test]
    fn test_rejects_garbage() {
        assert_eq!(text("abc"), None);
        assert_eq!(text(""), None);
        assert_eq!(text("   "), None);
        assert_eq!(text("1.m"), None);
        assert_eq!(text(".5m"), None);
        assert_eq!(text("5x"), None);
        assert_eq!(parse_magnitude(None), None);
    }

    #[test]
    fn test_non_finite_numbers_are_none() {
        assert_eq!(parse_magnitude(Some(&MagnitudeInput::Number(f64::NAN))), None);
        assert_eq!(parse_magnitude(Some(&MagnitudeInput::Number(f64::INFINITY))), None);
        assert_eq!(text("inf"), None);
    }

    #[test]
    fn test_rate_text() {
        assert_eq!(parse_rate_text("$1.5m/s"), Some(1_500_000.0));
        assert_eq!(parse_rate_text("250K/S"), Some(250_000.0));
        assert_eq!(parse_rate_text("$900"), Some(900.0));
        assert_eq!(parse_rate_text("pending"), None);
    }

    #[test]
    fn test_untagged_deserialization() {
        let n: MagnitudeInput = serde_json::from_str("5000000").unwrap();
        assert_eq!(n, MagnitudeInput::Number(5_000_000.0));
        let s: MagnitudeInput = serde_json::from_str("\"5m\"").unwrap();
        assert_eq!(parse_magnitude(Some(&s)), Some(5_000_000.0));
    }

    #[test]
    fn test_format_human() {
        assert_eq!(format_human(1_500_000.0), "1.5M");
        assert_eq!(format_human(750_000.0), "750K");
        assert_eq!(format_human(2_000_000_000.0), "2B");
        assert_eq!(format_human(1_234_567.0), "1.235M");
        assert_eq!(format_human(3e12), "3T");
        assert_eq!(format_human(999.0), "999");
        assert_eq!(format_human(0.0), "0");
    }
}
