use std::str::FromStr;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;

fn date_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{1,4}[/.\-]\d{1,2}(?:[/.\-]\d{2,4})?$").expect("valid regex"))
}

fn amount_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[-+(]?(?:R\$|\$)?-?\d{1,3}(?:[.,]?\d{3})*[.,]\d{2}\)?-?[DdCc]?$")
            .expect("valid regex")
    })
}

fn compact(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && *c != '"')
        .collect()
}

/// Parse a statement amount into a 2-decimal value.
///
/// Accepts Brazilian (`1.234,56`) and US (`1,234.56`) separators, currency
/// prefixes, parentheses and leading/trailing minus for negatives, and the
/// `D` (debit) / `C` (credit) suffixes some banks print after the value.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let mut s = compact(raw).replace("R$", "").replace('$', "");
    let mut negative = false;

    if let Some(rest) = s.strip_suffix(|c: char| c == 'D' || c == 'd') {
        negative = true;
        s = rest.to_string();
    } else if let Some(rest) = s.strip_suffix(|c: char| c == 'C' || c == 'c') {
        s = rest.to_string();
    }
    if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        negative = !negative;
        s = inner.to_string();
    }
    if let Some(rest) = s.strip_prefix('-') {
        negative = !negative;
        s = rest.to_string();
    } else if let Some(rest) = s.strip_prefix('+') {
        s = rest.to_string();
    }
    if let Some(rest) = s.strip_suffix('-') {
        negative = !negative;
        s = rest.to_string();
    }

    if !s.chars().any(|c| c.is_ascii_digit())
        || !s.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',')
    {
        return None;
    }

    let normalized = match (s.rfind(','), s.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => s.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => s.replace(',', ""),
        (Some(_), None) => single_separator(&s, ','),
        (None, Some(_)) => single_separator(&s, '.'),
        (None, None) => s,
    };

    let value = Decimal::from_str(&normalized).ok()?.round_dp(2);
    Some(if negative { -value } else { value })
}

/// With only one kind of separator, a single occurrence not followed by
/// exactly three digits is the decimal point; anything else groups thousands.
fn single_separator(s: &str, sep: char) -> String {
    let count = s.matches(sep).count();
    let decimals = s.rsplit(sep).next().map_or(0, str::len);
    if count == 1 && decimals != 3 {
        s.replace(sep, ".")
    } else {
        s.replace(sep, "")
    }
}

/// Parse a statement date. Day-first formats (`dd/mm/yyyy`, `dd/mm/yy`,
/// `dd-mm-yyyy`, `dd.mm.yyyy`) and ISO `yyyy-mm-dd` are accepted; a trailing
/// time is ignored. `dd/mm` needs the statement year as a hint.
pub fn parse_date(raw: &str, year_hint: Option<i32>) -> Option<NaiveDate> {
    let token = raw.split_whitespace().next()?;
    if !date_token_re().is_match(token) {
        return None;
    }
    let parts: Vec<&str> = token.split(&['/', '-', '.'][..]).collect();
    let nums: Vec<u32> = parts
        .iter()
        .map(|p| p.parse().ok())
        .collect::<Option<Vec<_>>>()?;

    let (year, month, day) = match parts.len() {
        3 if parts[0].len() == 4 => (nums[0] as i32, nums[1], nums[2]),
        3 => {
            let year = match parts[2].len() {
                4 => nums[2] as i32,
                2 => 2000 + nums[2] as i32,
                _ => return None,
            };
            (year, nums[1], nums[0])
        }
        2 if parts[0].len() <= 2 => (year_hint?, nums[1], nums[0]),
        _ => return None,
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Excel stores dates as days since 1899-12-30 (the 1900 leap-year bug).
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !(1.0..=2_958_465.0).contains(&serial) {
        return None;
    }
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    base.checked_add_signed(chrono::Duration::days(serial.trunc() as i64))
}

pub fn looks_like_date(raw: &str) -> bool {
    raw.split_whitespace()
        .next()
        .is_some_and(|t| date_token_re().is_match(t))
}

pub fn looks_like_amount(raw: &str) -> bool {
    amount_token_re().is_match(&compact(raw))
}

/// Strip control characters and collapse whitespace.
pub fn clean_description(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Comparison key for descriptions and rule keywords.
pub fn match_key(raw: &str) -> String {
    clean_description(raw).to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_amount_brazilian() {
        assert_eq!(parse_amount("1.234,56"), Some(dec!(1234.56)));
        assert_eq!(parse_amount("-1.234,56"), Some(dec!(-1234.56)));
        assert_eq!(parse_amount("R$ 50,00"), Some(dec!(50.00)));
        assert_eq!(parse_amount("-R$ 50,00"), Some(dec!(-50.00)));
        assert_eq!(parse_amount("12,5"), Some(dec!(12.5)));
        assert_eq!(parse_amount("1.234"), Some(dec!(1234)));
    }

    #[test]
    fn test_parse_amount_us() {
        assert_eq!(parse_amount("1,234.56"), Some(dec!(1234.56)));
        assert_eq!(parse_amount("\"500.00\""), Some(dec!(500.00)));
        assert_eq!(parse_amount("  -42.50  "), Some(dec!(-42.50)));
        assert_eq!(parse_amount("$1,000,000.99"), Some(dec!(1000000.99)));
    }

    #[test]
    fn test_parse_amount_sign_markers() {
        assert_eq!(parse_amount("(500,00)"), Some(dec!(-500.00)));
        assert_eq!(parse_amount("89,90-"), Some(dec!(-89.90)));
        assert_eq!(parse_amount("89,90 D"), Some(dec!(-89.90)));
        assert_eq!(parse_amount("89,90 C"), Some(dec!(89.90)));
    }

    #[test]
    fn test_parse_amount_rounds_to_cents() {
        assert_eq!(parse_amount("1.5555"), Some(dec!(1.56)));
        assert_eq!(parse_amount("10.0049"), Some(dec!(10.00)));
    }

    #[test]
    fn test_parse_amount_rejects_garbage() {
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("Valor"), None);
        assert_eq!(parse_amount("R$"), None);
        assert_eq!(parse_amount("12a,00"), None);
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("15/03/2025", None), Some(date(2025, 3, 15)));
        assert_eq!(parse_date("15/03/25", None), Some(date(2025, 3, 15)));
        assert_eq!(parse_date("2025-03-15", None), Some(date(2025, 3, 15)));
        assert_eq!(parse_date("15-03-2025", None), Some(date(2025, 3, 15)));
        assert_eq!(parse_date("15.03.2025", None), Some(date(2025, 3, 15)));
        assert_eq!(parse_date("15/03/2025 10:42", None), Some(date(2025, 3, 15)));
    }

    #[test]
    fn test_parse_date_day_month_needs_year_hint() {
        assert_eq!(parse_date("15/03", None), None);
        assert_eq!(parse_date("15/03", Some(2024)), Some(date(2024, 3, 15)));
    }

    #[test]
    fn test_parse_date_rejects_invalid() {
        assert_eq!(parse_date("31/02/2025", None), None);
        assert_eq!(parse_date("15/13/2025", None), None);
        assert_eq!(parse_date("Data", None), None);
        assert_eq!(parse_date("", None), None);
        assert_eq!(parse_date("1/2/345", None), None);
    }

    #[test]
    fn test_excel_serial_to_date() {
        assert_eq!(excel_serial_to_date(45667.0), Some(date(2025, 1, 10)));
        assert_eq!(excel_serial_to_date(0.0), None);
    }

    #[test]
    fn test_looks_like() {
        assert!(looks_like_date("03/15/2025"));
        assert!(!looks_like_date("Data"));
        assert!(looks_like_amount("-1.234,56"));
        assert!(looks_like_amount("R$ 10,00"));
        assert!(!looks_like_amount("1234"));
        assert!(!looks_like_amount("Valor"));
    }

    #[test]
    fn test_clean_description() {
        assert_eq!(clean_description("  PADARIA\t\tPAO  QUENTE\u{0007} "), "PADARIA PAO QUENTE");
        assert_eq!(match_key(" Supermercado  ABC "), "supermercado abc");
    }
}
