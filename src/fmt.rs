use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Format an amount in reais with Brazilian separators: R$ 1.234,56
pub fn money(val: Decimal) -> String {
    let negative = val.is_sign_negative() && !val.is_zero();
    let cents = format!("{:.2}", val.abs().round_dp(2));
    let (int_part, dec_part) = cents.split_once('.').unwrap_or((cents.as_str(), "00"));

    let mut with_dots = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_dots.push('.');
        }
        with_dots.push(c);
    }
    let with_dots: String = with_dots.chars().rev().collect();

    if negative {
        format!("-R$ {with_dots},{dec_part}")
    } else {
        format!("R$ {with_dots},{dec_part}")
    }
}

/// dd/mm/yyyy, the way statements print dates.
pub fn date(d: NaiveDate) -> String {
    d.format("%d/%m/%Y").to_string()
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let cut: String = s.chars().take(max.saturating_sub(1)).collect();
    format!("{cut}…")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_money_formatting() {
        assert_eq!(money(dec!(1234.56)), "R$ 1.234,56");
        assert_eq!(money(dec!(-500)), "-R$ 500,00");
        assert_eq!(money(dec!(0)), "R$ 0,00");
        assert_eq!(money(dec!(1000000.99)), "R$ 1.000.000,99");
        assert_eq!(money(dec!(42.1)), "R$ 42,10");
    }

    #[test]
    fn test_date_and_truncate() {
        assert_eq!(date(NaiveDate::from_ymd_opt(2025, 3, 5).unwrap()), "05/03/2025");
        assert_eq!(truncate("PADARIA", 10), "PADARIA");
        assert_eq!(truncate("SUPERMERCADO DIA", 6), "SUPER…");
    }
}
