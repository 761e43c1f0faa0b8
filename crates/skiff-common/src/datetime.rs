use chrono::{Duration, NaiveDate};

use crate::error::{CommonError, CommonResult};

/// Converts days since the Unix epoch (the Arrow `Date32` representation)
/// to a calendar date.
pub fn date_from_days(days: i32) -> CommonResult<NaiveDate> {
    epoch()
        .checked_add_signed(Duration::days(days as i64))
        .ok_or_else(|| CommonError::invalid(format!("date out of range: {days} days since epoch")))
}

/// Converts a calendar date to days since the Unix epoch.
pub fn days_from_date(date: NaiveDate) -> i32 {
    (date - epoch()).num_days() as i32
}

fn epoch() -> NaiveDate {
    // `NaiveDate::default` is the Unix epoch.
    NaiveDate::default()
}

/// Translates a Spark datetime pattern (e.g. `dd-MM-yyyy`) to a
/// `chrono` format string.
pub fn spark_format_to_chrono(pattern: &str) -> CommonResult<String> {
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        let mut run = 1;
        while chars.peek() == Some(&c) {
            chars.next();
            run += 1;
        }
        match (c, run) {
            ('y', 4) => out.push_str("%Y"),
            ('y', 2) => out.push_str("%y"),
            ('M', 2) => out.push_str("%m"),
            ('M', 3) => out.push_str("%b"),
            ('M', 4) => out.push_str("%B"),
            ('d', 2) => out.push_str("%d"),
            ('d', 1) => out.push_str("%-d"),
            ('E', 1..=3) => out.push_str("%a"),
            ('E', 4) => out.push_str("%A"),
            ('D', 3) => out.push_str("%j"),
            ('%', _) => {
                for _ in 0..run {
                    out.push_str("%%");
                }
            }
            _ if c.is_ascii_alphabetic() => {
                return Err(CommonError::unsupported(format!(
                    "datetime pattern: {}",
                    c.to_string().repeat(run)
                )));
            }
            _ => {
                for _ in 0..run {
                    out.push(c);
                }
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{date_from_days, days_from_date, spark_format_to_chrono};

    #[test]
    fn test_day_conversion_round_trip() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let days = days_from_date(date);
        assert_eq!(date_from_days(days).unwrap(), date);
        assert_eq!(days_from_date(date_from_days(0).unwrap()), 0);
    }

    #[test]
    fn test_spark_pattern_translation() {
        assert_eq!(spark_format_to_chrono("yyyy-MM-dd").unwrap(), "%Y-%m-%d");
        assert_eq!(spark_format_to_chrono("dd-MM-yyyy").unwrap(), "%d-%m-%Y");
        assert!(spark_format_to_chrono("yyyy-QQ").is_err());
    }
}
