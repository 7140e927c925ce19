//! Amount parsing for spreadsheet cells.
//!
//! Cells arrive as text exported from a spreadsheet with a Russian/Uzbek
//! locale: spaces as thousands separators, a comma as the decimal mark,
//! currency symbols, and the odd non-breaking space mangled into `Â`.
//!
//! Parsing tries two paths in order:
//! 1. [`parse_decimal_comma`] when the cleaned text contains a comma.
//! 2. [`parse_integer_digits`] otherwise, or when path 1 fails. This path
//!    is integer-only: every digit run is concatenated, so `"12.50"` becomes
//!    `1250`.

/// Parses an amount cell into a signed value, defaulting to `0.0`.
#[must_use]
pub fn parse_amount(raw: &str) -> f64 {
    let trimmed = raw.trim();
    let negative = trimmed.contains('-');

    let cleaned = clean_cell(trimmed);
    if cleaned.is_empty() {
        return 0.0;
    }

    let magnitude = if cleaned.contains(',') {
        parse_decimal_comma(&cleaned).or_else(|| parse_integer_digits(&cleaned))
    } else {
        parse_integer_digits(&cleaned)
    };

    match magnitude {
        // -0.0 would render as "-0,00"
        Some(value) if negative && value != 0.0 => -value,
        Some(value) => value,
        None => 0.0,
    }
}

/// Joins a whole-part cell with the following fractional cell.
///
/// The export splits `"1 234,56"` across two columns when the sheet stores
/// the decimal comma unquoted. The second column counts as a fraction only
/// when it is non-empty and all digits.
#[must_use]
pub fn join_split_amount(whole: &str, fraction: Option<&str>) -> String {
    let whole = whole.trim();
    match fraction.map(str::trim) {
        Some(f) if !f.is_empty() && f.chars().all(|c| c.is_ascii_digit()) => {
            format!("{whole},{f}")
        }
        _ => whole.to_owned(),
    }
}

/// Decimal-comma path: drops whitespace, turns the comma into a point and
/// parses as a float.
#[must_use]
pub fn parse_decimal_comma(cleaned: &str) -> Option<f64> {
    let normalized: String = cleaned
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Integer-only fallback path: concatenates every digit run.
///
/// Returns `None` when the text holds no digits at all.
#[must_use]
pub fn parse_integer_digits(cleaned: &str) -> Option<f64> {
    let digits: String = cleaned.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }

    // Avoids u64 overflow on absurdly long digit strings
    digits.parse::<f64>().ok()
}

/// Removes the sign, encoding artifacts and anything that is not part of a
/// number.
fn clean_cell(text: &str) -> String {
    text.replace('-', "")
        .replace('Â', "")
        .replace('\u{00A0}', " ")
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.' || c.is_whitespace())
        .collect::<String>()
        .trim()
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_grouped_decimal_comma() {
        assert!(approx(parse_amount("1 234,56"), 1234.56));
    }

    #[test]
    fn test_negative_decimal_comma() {
        assert!(approx(parse_amount("-12,50"), -12.50));
    }

    #[test]
    fn test_empty_and_blank() {
        assert!(approx(parse_amount(""), 0.0));
        assert!(approx(parse_amount("   "), 0.0));
        assert!(approx(parse_amount("-"), 0.0));
    }

    #[test]
    fn test_plain_integer() {
        assert!(approx(parse_amount("1234"), 1234.0));
    }

    #[test]
    fn test_trailing_comma_does_not_panic() {
        assert!(approx(parse_amount("12,"), 12.0));
    }

    #[test]
    fn test_currency_and_nbsp() {
        assert!(approx(parse_amount("$\u{00A0}1\u{00A0}500,25"), 1500.25));
        assert!(approx(parse_amount("Â 2 000 $"), 2000.0));
    }

    #[test]
    fn test_integer_path_merges_groups() {
        // No comma: the point is not a decimal mark on this path
        assert!(approx(parse_amount("12.50"), 1250.0));
        assert!(approx(parse_amount("1 000 000"), 1_000_000.0));
    }

    #[test]
    fn test_unparseable_comma_falls_back_to_digits() {
        // "1,2,3" -> "1.2.3" fails as a float, digits merge to 123
        assert!(approx(parse_amount("1,2,3"), 123.0));
    }

    #[test]
    fn test_minus_anywhere_negates() {
        assert!(approx(parse_amount("150 -"), -150.0));
    }

    #[test]
    fn test_join_split_amount() {
        assert_eq!(join_split_amount("1 234", Some("56")), "1 234,56");
        assert_eq!(join_split_amount("1 234", Some("")), "1 234");
        assert_eq!(join_split_amount("1 234", Some("abc")), "1 234");
        assert_eq!(join_split_amount(" 7 ", None), "7");
        assert!(approx(parse_amount(&join_split_amount("-45", Some("5"))), -45.5));
    }

    #[test]
    fn test_named_paths() {
        assert_eq!(parse_decimal_comma("3,75"), Some(3.75));
        assert_eq!(parse_decimal_comma("1,2,3"), None);
        assert_eq!(parse_integer_digits("12 345"), Some(12345.0));
        assert_eq!(parse_integer_digits(" . "), None);
    }
}
