//! Money and timestamp rendering.

use chrono::{DateTime, FixedOffset, Utc};

/// Uzbekistan time (UTC+5, no daylight saving).
pub const LOCAL_OFFSET: FixedOffset = match FixedOffset::east_opt(5 * 3600) {
    Some(offset) => offset,
    None => panic!("UTC+5 is a valid offset"),
};

/// Current time at [`LOCAL_OFFSET`].
#[must_use]
pub fn local_now() -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&LOCAL_OFFSET)
}

/// `dd.mm.YYYY - HH:MM`.
#[must_use]
pub fn format_timestamp(at: &DateTime<FixedOffset>) -> String {
    at.format("%d.%m.%Y - %H:%M").to_string()
}

/// `dd.mm.YYYY`.
#[must_use]
pub fn format_date(at: &DateTime<FixedOffset>) -> String {
    at.format("%d.%m.%Y").to_string()
}

/// Renders an amount with two decimals, a space between thousands and a
/// decimal comma: `1234.5` becomes `"1 234,50"`.
#[must_use]
pub fn format_money(value: f64) -> String {
    let (negative, whole, fraction) = split_cents(value);
    let sign = if negative { "-" } else { "" };
    format!("{sign}{},{fraction:02}", group_thousands(whole))
}

/// Like [`format_money`] but always signed: `"+5,00"`, `"-5,00"`, `"0,00"`.
#[must_use]
pub fn format_signed_money(value: f64) -> String {
    let (negative, whole, fraction) = split_cents(value);
    let sign = match (negative, whole, fraction) {
        (_, 0, 0) => "",
        (true, _, _) => "-",
        (false, _, _) => "+",
    };
    format!("{sign}{},{fraction:02}", group_thousands(whole))
}

/// Rounds to cents. `-0.001` rounds to an unsigned zero.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn split_cents(value: f64) -> (bool, u64, u64) {
    if !value.is_finite() {
        return (false, 0, 0);
    }
    let cents = (value.abs() * 100.0).round() as u64;
    (value < 0.0 && cents > 0, cents / 100, cents % 100)
}

fn group_thousands(whole: u64) -> String {
    let digits = whole.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(' ');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(1234.5), "1 234,50");
        assert_eq!(format_money(-1234.5), "-1 234,50");
        assert_eq!(format_money(0.0), "0,00");
        assert_eq!(format_money(999.999), "1 000,00");
        assert_eq!(format_money(1_234_567.891), "1 234 567,89");
        assert_eq!(format_money(-0.001), "0,00");
    }

    #[test]
    fn test_format_signed_money() {
        assert_eq!(format_signed_money(5.0), "+5,00");
        assert_eq!(format_signed_money(-12.5), "-12,50");
        assert_eq!(format_signed_money(0.0), "0,00");
    }

    #[test]
    fn test_timestamp_in_local_offset() {
        let at = Utc
            .with_ymd_and_hms(2025, 9, 1, 20, 30, 0)
            .unwrap()
            .with_timezone(&LOCAL_OFFSET);
        assert_eq!(format_timestamp(&at), "02.09.2025 - 01:30");
        assert_eq!(format_date(&at), "02.09.2025");
    }
}
