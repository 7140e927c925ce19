//! Message texts sent to users.
//!
//! Every formatter is a pure function of its records and the timestamp, so
//! they can be tested without a clock or a transport. List messages are
//! Markdown with the table inside a code block.

use chrono::{DateTime, FixedOffset};

use super::money::{format_money, format_signed_money, format_timestamp};
use crate::import::ImportSummary;
use crate::monitor::{ChangeEvent, ChangeKind};
use crate::sheets::{BalanceRecord, ContainerRecord, ProfitEntry};

pub const NOT_REGISTERED: &str =
    "❌ Sizning telefon raqamingiz tizimda ro'yxatdan o'tmagan.\n\nAdmin bilan bog'laning.";
pub const TECHNICAL_ERROR: &str = "❌ Texnik xatolik yuz berdi. Qaytadan urinib ko'ring.";
pub const SHARE_OWN_CONTACT: &str = "Iltimos, o'zingizning telefon raqamingizni yuboring.";
pub const ASK_CODE: &str = "📱 Telefon raqam tasdiqlandi!\n\n🔐 Endi tasdiqlash kodini yuboring:";
pub const WRONG_CODE: &str = "❌ Noto'g'ri kod!\n\n🔐 Iltimos, to'g'ri kodni kiriting:";
pub const PHONE_MISSING: &str = "❌ Telefon raqam topilmadi.";
pub const CODE_MISSING: &str = "❌ Sizning kodingiz tizimda topilmadi.";
pub const CONTAINER_NOT_FOUND: &str = "📦 Container ma'lumotlaringiz topilmadi yoki 5$ dan kam.";
pub const BALANCE_NOT_FOUND: &str = "❌ Balans ma'lumotini olishda xatolik yuz berdi.";
pub const MENU_REFRESH: &str = "💰📦";
pub const NO_UPLOAD_RIGHTS: &str = "❌ Siz Excel fayl yuklash huquqiga ega emassiz.";
pub const UNSUPPORTED_FILE: &str = "❌ Faqat Excel (.xlsx, .xls) yoki CSV fayllar qabul qilinadi.";
pub const UNKNOWN_COMMAND: &str = "Noma'lum komanda!";
pub const CHOOSE_ROLE: &str = "Qaysi rol sifatida kirishni xohlaysiz?";
pub const MANAGER_PANEL: &str = "👨‍💼 Manager paneli\n\nQuyidagi tugmalardan birini tanlang:";
pub const INVESTOR_PANEL: &str = "💰 Investor paneli\n\nQuyidagi tugmalardan birini tanlang:";
pub const DEBTORS_MENU: &str = "📋 Qarzdorlar bo'limi\n\nQaysi turdagi qarzdorlarni ko'rmoqchisiz?";
pub const PICK_YEAR: &str = "📈 Foyda ma'lumotlari\n\nQaysi yil uchun foyda ma'lumotlarini ko'rmoqchisiz?";
pub const NEXT_ACTION: &str = "🔄 Keyingi amal uchun tanlang:";
pub const NO_INVESTOR_SHEET: &str = "❌ Sizning hisobingiz uchun foyda jadvali sozlanmagan.";
pub const CONFIRM_PHONE: &str = "Botdan foydalanish uchun telefon raqamingizni tasdiqlang:";
pub const MANAGER_WELCOME: &str = "Siz manager sifatida kirdingiz.";
pub const INVESTOR_WELCOME: &str = "Siz investor sifatida kirdingiz.";
pub const LIST_FAILED: &str = "❌ Ro'yxatni olishda xatolik yuz berdi.";

/// Uzbek month name for `1..=12`.
#[must_use]
pub fn month_name(month: u32) -> &'static str {
    const NAMES: [&str; 12] = [
        "Yanvar",
        "Fevral",
        "Mart",
        "Aprel",
        "May",
        "Iyun",
        "Iyul",
        "Avgust",
        "Sentyabr",
        "Oktyabr",
        "Noyabr",
        "Dekabr",
    ];
    usize::try_from(month)
        .ok()
        .and_then(|m| m.checked_sub(1))
        .and_then(|i| NAMES.get(i))
        .copied()
        .unwrap_or("?")
}

/// Greeting on `/start`.
#[must_use]
pub fn greeting(first_name: &str, tail: &str) -> String {
    if tail.is_empty() {
        format!("Assalomu alaykum, {first_name}! 👋")
    } else {
        format!("Assalomu alaykum, {first_name}! 👋\n\n{tail}")
    }
}

#[must_use]
pub fn welcome_authenticated(name: &str) -> String {
    let name = if name.is_empty() { "Mijoz" } else { name };
    format!("✅ Kod tasdiqlandi!\n\nXush kelibsiz, {name}!")
}

#[must_use]
pub fn pick_month(year: i32) -> String {
    format!("📅 {year} yili\n\nQaysi oy uchun foyda ma'lumotlarini ko'rmoqchisiz?")
}

/// Air balance card of one customer.
#[must_use]
pub fn balance_card(record: &BalanceRecord, now: &DateTime<FixedOffset>) -> String {
    let mut text = String::from("🛩️📊 Air ma'lumotlari\n\n");
    push_field(&mut text, "👤 Ism", &record.name);
    push_field(&mut text, "📱 Telefon", &record.phone);
    push_field(&mut text, "🆔 Kod", &record.code);
    text.push_str(&format!(
        "\n💰 Balans: {} $\n🕐 {}",
        format_money(record.amount),
        format_timestamp(now)
    ));
    text
}

/// Container charge card of one customer.
#[must_use]
pub fn container_card(record: &ContainerRecord, now: &DateTime<FixedOffset>) -> String {
    let mut text = String::from("📦🔍 Container ma'lumotlari\n\n");
    push_field(&mut text, "👤 Ism", &record.name);
    push_field(&mut text, "🆔 Kod", &record.code);
    text.push_str(&format!(
        "\n💰 Balans: {} $\n🕐 {}",
        format_money(record.amount),
        format_timestamp(now)
    ));
    text
}

/// Air plus container total, as a Markdown code block.
#[must_use]
pub fn total_balance(
    air: Option<&BalanceRecord>,
    container: Option<&ContainerRecord>,
    now: &DateTime<FixedOffset>,
) -> String {
    let air_amount = air.map_or(0.0, |r| r.amount);
    let container_amount = container.map_or(0.0, |r| r.amount);
    let field = |value: Option<&str>| match value {
        Some(v) if !v.is_empty() => v.to_owned(),
        _ => "N/A".to_owned(),
    };

    let rule = "─".repeat(22);
    format!(
        "💰📊 Umumiy balans\n\n```\n\
         {:<6} {}\n{:<6} {}\n{:<6} {}\n{rule}\n\
         {:<8} {:>12}\n{:<8} {:>12}\n{rule}\n{:<8} {:>12}\n```\n\n🕐 {}",
        "Ism:",
        field(air.map(|r| r.name.as_str())),
        "Tel:",
        field(air.map(|r| r.phone.as_str())),
        "Kod:",
        field(air.map(|r| r.code.as_str())),
        "Air:",
        format!("{} $", format_money(air_amount)),
        "Cont:",
        format!("{} $", format_money(container_amount)),
        "UMUMIY:",
        format!("{} $", format_money(air_amount + container_amount)),
        format_timestamp(now),
    )
}

/// Push notification for a changed balance or container amount.
#[must_use]
pub fn change_notification(
    event: &ChangeEvent,
    phone: &str,
    now: &DateTime<FixedOffset>,
) -> String {
    let marker = event.direction().marker();
    let (icon, title) = match event.kind {
        ChangeKind::Balance => ("🛩️", "Air balans o'zgarishi"),
        ChangeKind::Container => ("📦", "Container balans o'zgarishi"),
    };

    let mut text = format!("{icon}{marker} {title}\n\n");
    push_field(&mut text, "👤 Ism", &event.name);
    push_field(&mut text, "📱 Telefon", phone);
    if event.kind == ChangeKind::Container {
        push_field(&mut text, "🆔 Kod", &event.code);
    }
    text.push_str(&format!(
        "\n💰 Oldingi balans: {} $\n{marker} O'zgarish: {} $\n💰 Yangi balans: {} $\n\n🕐 {}",
        format_money(event.old_amount),
        format_signed_money(event.new_amount - event.old_amount),
        format_money(event.new_amount),
        format_timestamp(now),
    ));
    text
}

/// Manager list of customers with a positive balance.
#[must_use]
pub fn positive_balances(records: &[BalanceRecord], min: f64, now: &DateTime<FixedOffset>) -> String {
    if records.is_empty() {
        return format!(
            "✅ Hozirda {} dan yuqori musbat balansga ega mijozlar yo'q.",
            threshold(min)
        );
    }

    let rows = records
        .iter()
        .map(|r| vec![r.code.clone(), format!("{} $", format_money(r.amount))])
        .collect::<Vec<_>>();
    let total: f64 = records.iter().map(|r| r.amount).sum();

    format!(
        "🛩️💰 Air balansi ({}+)\n\n{}\n📊 Jami: {} ta mijoz\n💰 Umumiy: {} $\n🕐 {}",
        threshold(min),
        table(&[("Kod", 8), ("Balans", 14)], &rows),
        records.len(),
        format_money(total),
        format_timestamp(now),
    )
}

/// Manager list of customers in debt, amounts shown as positive debt.
#[must_use]
pub fn debtors(records: &[BalanceRecord], min: f64, now: &DateTime<FixedOffset>) -> String {
    if records.is_empty() {
        return format!(
            "✅ Hozirda {} dan yuqori qarzi bo'lgan mijozlar yo'q.",
            threshold(min)
        );
    }

    let rows = records
        .iter()
        .map(|r| vec![r.code.clone(), format!("{} $", format_money(r.amount.abs()))])
        .collect::<Vec<_>>();
    let total: f64 = records.iter().map(|r| r.amount.abs()).sum();

    format!(
        "🛩️📋 Air qarzdorlari ({}+)\n\n{}\n📊 Jami: {} ta qarzdor\n💰 Umumiy: {} $\n🕐 {}",
        threshold(min),
        table(&[("Kod", 8), ("Qarzdorlik", 14)], &rows),
        records.len(),
        format_money(total),
        format_timestamp(now),
    )
}

/// Manager list of visible container charges, largest first.
#[must_use]
pub fn container_list(records: &[ContainerRecord], min: f64, now: &DateTime<FixedOffset>) -> String {
    if records.is_empty() {
        return format!(
            "✅ Hozirda {} dan yuqori Container balansga ega mijozlar yo'q.",
            threshold(min)
        );
    }

    let mut sorted: Vec<_> = records.iter().collect();
    sorted.sort_by(|a, b| b.amount.total_cmp(&a.amount));

    let rows = sorted
        .iter()
        .map(|r| {
            vec![
                r.name.clone(),
                r.code.clone(),
                format!("{} $", format_money(r.amount)),
            ]
        })
        .collect::<Vec<_>>();
    let total: f64 = records.iter().map(|r| r.amount).sum();

    format!(
        "📦💰 Container balanslari ({}+)\n\n{}\n📊 Jami: {} ta mijoz\n💰 Umumiy: {} $\n🕐 {}",
        threshold(min),
        table(&[("Ism", 12), ("Kod", 8), ("Balans", 14)], &rows),
        records.len(),
        format_money(total),
        format_timestamp(now),
    )
}

/// Investor profit for one month.
#[must_use]
pub fn investor_profit(
    entries: &[ProfitEntry],
    year: i32,
    month: u32,
    now: &DateTime<FixedOffset>,
) -> String {
    let period = format!("{year} yil {} oyi", month_name(month));
    if entries.is_empty() {
        return format!("📊 {period}\n\n❌ Bu oy uchun foyda ma'lumotlari topilmadi.");
    }

    let mut rows = entries
        .iter()
        .map(|e| vec![e.description.clone(), format!("{} $", format_money(e.amount))])
        .collect::<Vec<_>>();
    let total: f64 = entries.iter().map(|e| e.amount).sum();
    rows.push(vec!["JAMI:".to_owned(), format!("{} $", format_money(total))]);

    format!(
        "📊💰 {period} foydasi\n\n{}\n📈 Jami yozuvlar: {} ta\n💰 Umumiy foyda: {} $\n🕐 {}",
        table(&[("Tavsif", 20), ("Summa", 14)], &rows),
        entries.len(),
        format_money(total),
        format_timestamp(now),
    )
}

#[must_use]
pub fn profit_failed(year: i32, month: u32) -> String {
    format!(
        "❌ {year} yil {} oyi foyda ma'lumotlarini olishda xatolik yuz berdi.",
        month_name(month)
    )
}

/// Result of a bulk charge import.
#[must_use]
pub fn import_summary(summary: &ImportSummary) -> String {
    format!(
        "✅ Excel fayl muvaffaqiyatli qayta ishlandi!\n\n\
         📊 Kodlar: {} ta\n📋 Topilgan kodlar: {}\n💰 Umumiy summa: {} $\n📝 Yangilangan yozuvlar: {}\n❌ Topilmagan kodlar: {}",
        summary.codes_count,
        summary.found,
        format_money(summary.total_amount),
        summary.updated,
        summary.not_found,
    )
}

#[must_use]
pub fn import_failed(reason: &str) -> String {
    format!("❌ Xatolik: {reason}")
}

fn push_field(text: &mut String, label: &str, value: &str) {
    if !value.is_empty() {
        text.push_str(&format!("{label}: {value}\n"));
    }
}

/// `$5` for whole amounts, `$2,50` otherwise.
fn threshold(min: f64) -> String {
    let money = format_money(min);
    format!("${}", money.strip_suffix(",00").unwrap_or(&money))
}

/// Numbered fixed-width table inside a Markdown code block.
fn table(columns: &[(&str, usize)], rows: &[Vec<String>]) -> String {
    let mut out = String::from("```\n");

    out.push_str(&format!("{:<3}", "№"));
    for (title, width) in columns {
        out.push_str(&format!(" {:<width$}", title, width = *width));
    }
    out.push('\n');

    out.push_str(&"─".repeat(3));
    for (_, width) in columns {
        out.push(' ');
        out.push_str(&"─".repeat(*width));
    }
    out.push('\n');

    for (i, row) in rows.iter().enumerate() {
        out.push_str(&format!("{:<3}", i + 1));
        for ((_, width), cell) in columns.iter().zip(row) {
            out.push_str(&format!(" {:<width$}", fit(cell, *width), width = *width));
        }
        out.push('\n');
    }

    out.push_str("```\n");
    out
}

/// Shortens a cell to `width` characters, marking the cut with `…`.
fn fit(cell: &str, width: usize) -> String {
    if cell.chars().count() <= width {
        cell.to_owned()
    } else {
        let mut short: String = cell.chars().take(width.saturating_sub(1)).collect();
        short.push('…');
        short
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::report::LOCAL_OFFSET;

    fn now() -> DateTime<FixedOffset> {
        Utc.with_ymd_and_hms(2025, 9, 1, 5, 0, 0)
            .unwrap()
            .with_timezone(&LOCAL_OFFSET)
    }

    fn balance(name: &str, code: &str, amount: f64) -> BalanceRecord {
        BalanceRecord {
            phone: "+998 90 123 45 67".to_owned(),
            name: name.to_owned(),
            list_name: "12".to_owned(),
            code: code.to_owned(),
            amount,
        }
    }

    #[test]
    fn test_balance_card() {
        let text = balance_card(&balance("Ali", "1111", 1234.5), &now());
        assert!(text.contains("1 234,50"));
        assert!(text.contains("🆔 Kod: 1111"));
        assert!(text.ends_with("01.09.2025 - 10:00"));
    }

    #[test]
    fn test_change_notification_balance() {
        let event = ChangeEvent {
            kind: ChangeKind::Balance,
            key: "998901234567".to_owned(),
            name: "Ali".to_owned(),
            code: "1111".to_owned(),
            old_amount: 100.0,
            new_amount: 105.0,
        };

        let text = change_notification(&event, "+998 90 123 45 67", &now());
        assert!(text.starts_with("🛩️📈"));
        assert!(text.contains("📈 O'zgarish: +5,00 $"));
        assert!(text.contains("Yangi balans: 105,00 $"));
        assert!(!text.contains("🆔"));
    }

    #[test]
    fn test_change_notification_container_decrease() {
        let event = ChangeEvent {
            kind: ChangeKind::Container,
            key: "2222".to_owned(),
            name: "Vali".to_owned(),
            code: "2222".to_owned(),
            old_amount: 50.0,
            new_amount: 20.0,
        };

        let text = change_notification(&event, "901234567", &now());
        assert!(text.starts_with("📦📉"));
        assert!(text.contains("🆔 Kod: 2222"));
        assert!(text.contains("-30,00 $"));
    }

    #[test]
    fn test_total_balance_without_records() {
        let text = total_balance(None, None, &now());
        assert!(text.contains("N/A"));
        assert!(text.contains("0,00 $"));
        assert_eq!(text.matches("```").count(), 2);
    }

    #[test]
    fn test_debtors_table() {
        let records = vec![balance("Vali", "2222", -300.5), balance("Ali", "A-1234567890", -7.0)];
        let text = debtors(&records, 5.0, &now());
        assert!(text.contains("($5+)"));
        assert!(text.contains("300,50 $"));
        assert!(text.contains("A-12345…"));
        assert!(text.contains("Jami: 2 ta qarzdor"));
        assert!(text.contains("Umumiy: 307,50 $"));
    }

    #[test]
    fn test_empty_lists() {
        assert!(positive_balances(&[], 5.0, &now()).starts_with("✅"));
        assert!(container_list(&[], 2.5, &now()).contains("$2,50"));
    }

    #[test]
    fn test_investor_profit() {
        let entries = vec![
            ProfitEntry {
                period: "2025.09".to_owned(),
                description: "Rent".to_owned(),
                amount: 1000.5,
            },
            ProfitEntry {
                period: "2025.09".to_owned(),
                description: "Fuel".to_owned(),
                amount: 0.0,
            },
        ];

        let text = investor_profit(&entries, 2025, 9, &now());
        assert!(text.contains("2025 yil Sentyabr oyi"));
        assert!(text.contains("JAMI:"));
        assert!(text.contains("1 000,50 $"));
        assert!(investor_profit(&[], 2025, 1, &now()).contains("foyda ma'lumotlari topilmadi"));
    }

    #[test]
    fn test_month_name_bounds() {
        assert_eq!(month_name(1), "Yanvar");
        assert_eq!(month_name(12), "Dekabr");
        assert_eq!(month_name(0), "?");
        assert_eq!(month_name(13), "?");
    }
}
