//! Locating a customer row by phone number or by code.
//!
//! The balances sheet mixes international (`+998 90 123 45 67`) and local
//! (`90 123 45 67`) phone formats, so matching runs a cascade of rules,
//! first hit wins:
//!
//! 1. exact equality of the digit strings;
//! 2. the query carries the `998` country prefix: its local part equals, or
//!    is a suffix of, the sheet value;
//! 3. the sheet value carries the prefix: the query equals, or ends with,
//!    the sheet's local part;
//! 4. both are at least 9 digits: the last 9 digits agree.
//!
//! Rules 2 and 3 short-circuit the cascade once their prefix condition
//! holds, even if the comparison itself fails.

use super::records::{BalanceRecord, integer_form, normalize_code};

/// Uzbekistan country calling code.
pub const COUNTRY_PREFIX: &str = "998";

/// Length of a full international number (`998` + 9 digits).
const INTERNATIONAL_DIGITS: usize = 12;

/// Length of a local subscriber number.
const LOCAL_DIGITS: usize = 9;

/// Strips everything but ASCII digits.
#[must_use]
pub fn normalize_phone(phone: &str) -> String {
    phone.chars().filter(char::is_ascii_digit).collect()
}

/// Compares two digit-only phone numbers using the cascade above.
#[must_use]
pub fn phones_match(query: &str, stored: &str) -> bool {
    if query.is_empty() || stored.is_empty() {
        return false;
    }

    if query == stored {
        return true;
    }

    if query.starts_with(COUNTRY_PREFIX) && query.len() >= INTERNATIONAL_DIGITS {
        let local = &query[COUNTRY_PREFIX.len()..];
        return local == stored || stored.ends_with(local);
    }

    if stored.starts_with(COUNTRY_PREFIX) && stored.len() >= INTERNATIONAL_DIGITS {
        let local = &stored[COUNTRY_PREFIX.len()..];
        return query == local || query.ends_with(local);
    }

    if query.len() >= LOCAL_DIGITS && stored.len() >= LOCAL_DIGITS {
        return query[query.len() - LOCAL_DIGITS..] == stored[stored.len() - LOCAL_DIGITS..];
    }

    false
}

/// Finds the first balance row whose phone matches `phone`.
#[must_use]
pub fn find_by_phone(rows: &[Vec<String>], phone: &str) -> Option<BalanceRecord> {
    let query = normalize_phone(phone);
    if query.is_empty() {
        return None;
    }

    rows.iter()
        .skip(1)
        .filter_map(|row| BalanceRecord::from_row(row))
        .find(|record| phones_match(&query, &normalize_phone(&record.phone)))
}

/// Finds the first balance row whose code matches `code`.
///
/// The query drops a trailing `.0`; a sheet code exported as float text is
/// also compared by its integer form.
#[must_use]
pub fn find_by_code(rows: &[Vec<String>], code: &str) -> Option<BalanceRecord> {
    let query = normalize_code(code);
    if query.is_empty() {
        return None;
    }

    rows.iter()
        .skip(1)
        .filter_map(|row| BalanceRecord::from_row(row))
        .find(|record| codes_match(&query, &record.code))
}

/// Whether a normalized query code refers to a sheet code.
#[must_use]
pub fn codes_match(query: &str, stored: &str) -> bool {
    let stored = stored.trim();
    if stored.is_empty() {
        return false;
    }
    query == stored || integer_form(stored).is_some_and(|int| int == query)
}
