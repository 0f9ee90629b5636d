//! Price and currency normalization
//!
//! Turns locale-formatted text such as `$1,299.99`, `1.299,00 €` or
//! `EUR 12,99` into numbers and currency codes.

use once_cell::sync::Lazy;
use regex::Regex;

use super::error::{ParseError, ParseResult};

/// First run of digits with embedded separators
static NUMBER_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d[\d.,]*").expect("number token pattern is valid"));

/// Parses the first number in `raw`, stripping currency glyphs and thousands
/// separators.
///
/// When both `,` and `.` occur the later one is the decimal separator. A lone
/// `,` followed by exactly two digits is a decimal comma; any other lone `,`
/// groups thousands. Several `.` with no `,` are thousands separators.
pub fn normalize_price(raw: &str) -> ParseResult<f64> {
    let token = NUMBER_TOKEN
        .find(raw)
        .map(|m| m.as_str().trim_end_matches(['.', ',']))
        .ok_or_else(|| ParseError::NoNumber { raw: raw.to_string() })?;

    let normalized = match (token.rfind('.'), token.rfind(',')) {
        (Some(dot), Some(comma)) if comma > dot => token.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => token.replace(',', ""),
        (None, Some(comma)) if token.matches(',').count() == 1 && token.len() - comma - 1 == 2 => {
            token.replace(',', ".")
        }
        (None, Some(_)) => token.replace(',', ""),
        (Some(_), None) if token.matches('.').count() > 1 => token.replace('.', ""),
        _ => token.to_string(),
    };

    let value: f64 = normalized.parse().map_err(|_| ParseError::InvalidNumber {
        raw: raw.to_string(),
        normalized: normalized.clone(),
    })?;

    if !value.is_finite() || value <= 0.0 {
        return Err(ParseError::NotPositive {
            raw: raw.to_string(),
            value,
        });
    }

    Ok(value)
}

/// Extracts a currency from price-symbol text.
///
/// Three leading uppercase ASCII letters are taken as an ISO code, otherwise
/// the first glyph that is neither a digit, whitespace nor a separator.
pub fn normalize_currency(raw: &str) -> ParseResult<String> {
    let trimmed = raw.trim();

    let code: String = trimmed.chars().take(3).collect();
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_uppercase()) {
        return Ok(code);
    }

    trimmed
        .chars()
        .find(|c| !c.is_whitespace() && !c.is_ascii_digit() && !matches!(c, '.' | ',' | '-'))
        .map(String::from)
        .ok_or_else(|| ParseError::NoCurrency { raw: raw.to_string() })
}

/// Parses a savings badge such as `-15%` into `15.0`.
///
/// Only percentages in `0..=100` are accepted.
pub fn normalize_discount(raw: &str) -> ParseResult<f64> {
    let cleaned: String = raw.chars().filter(|c| !matches!(c, '-' | '%')).collect();
    let cleaned = cleaned.trim();
    let invalid = || ParseError::InvalidNumber {
        raw: raw.to_string(),
        normalized: cleaned.to_string(),
    };

    let value = cleaned.parse::<f64>().map_err(|_| invalid())?;
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err(invalid());
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("$19.99", 19.99)]
    #[case("$1,299.99", 1299.99)]
    #[case("1,299.", 1299.0)]
    #[case("1.299,00 €", 1299.0)]
    #[case("€12,99", 12.99)]
    #[case("£1,299", 1299.0)]
    #[case("₹1,24,999.00", 124_999.0)]
    #[case("1.299.000", 1_299_000.0)]
    #[case("  USD 7  ", 7.0)]
    #[case("$19.99$24.99", 19.99)]
    fn parses_locale_formats(#[case] raw: &str, #[case] expected: f64) {
        let value = normalize_price(raw).unwrap();
        assert!((value - expected).abs() < 1e-9, "{raw} -> {value}");
    }

    #[rstest]
    #[case("")]
    #[case("See all buying options")]
    #[case("$")]
    fn rejects_text_without_digits(#[case] raw: &str) {
        assert!(matches!(normalize_price(raw), Err(ParseError::NoNumber { .. })));
    }

    #[test]
    fn rejects_zero() {
        assert!(matches!(normalize_price("$0.00"), Err(ParseError::NotPositive { .. })));
    }

    #[rstest]
    #[case("$", "$")]
    #[case(" € ", "€")]
    #[case("EUR", "EUR")]
    #[case("USD 12", "USD")]
    #[case("₹", "₹")]
    fn extracts_currency(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(normalize_currency(raw).unwrap(), expected);
    }

    #[test]
    fn currency_needs_a_glyph() {
        assert!(normalize_currency(" 12.50 ").is_err());
        assert!(normalize_currency("").is_err());
    }

    #[test]
    fn discount_strips_sign_and_percent() {
        assert_eq!(normalize_discount("-15%").unwrap(), 15.0);
        assert_eq!(normalize_discount(" 7 % ").unwrap(), 7.0);
        assert_eq!(normalize_discount("100%").unwrap(), 100.0);
        assert!(normalize_discount("Save now").is_err());
    }

    #[rstest]
    #[case("NaN%")]
    #[case("inf%")]
    #[case("-inf%")]
    #[case("infinity")]
    #[case("150%")]
    fn rejects_discounts_outside_a_percentage(#[case] raw: &str) {
        assert!(matches!(normalize_discount(raw), Err(ParseError::InvalidNumber { .. })));
    }
}
