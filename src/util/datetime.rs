use chrono::{Datelike, Local, NaiveDate};

/// 今天的日期（本地時區）
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// 進度訊息使用的時間戳記，精確到分
pub fn now_minute() -> String {
    Local::now().format("%Y-%m-%d %H:%M").to_string()
}

/// Parses a date written as `YYYY.MM.DD` (Naver 日別時勢的日期格式).
///
/// `-` and `/` are accepted as separators too.
pub fn parse_dotted_date(date_str: &str) -> Option<NaiveDate> {
    let split_date: Vec<&str> = date_str.trim().split(['.', '-', '/']).collect();
    if split_date.len() != 3 {
        return None;
    }

    let year = parse_date_part::<i32>(split_date[0])?;
    let month = parse_date_part::<u32>(split_date[1])?;
    let day = parse_date_part::<u32>(split_date[2])?;

    NaiveDate::from_ymd_opt(year, month, day)
}

/// 建立日期；日數超過該月天數時取該月最後一天，例︰2024-02-31 => 2024-02-29
pub fn ymd_clamped(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let last_day = last_day_of_month(first);
    first.with_day(day.clamp(1, last_day.day()))
}

fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    let (y, m) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };

    NaiveDate::from_ymd_opt(y, m, 1)
        .and_then(|d| d.pred_opt())
        .unwrap_or(date)
}

/// Try to parse a string as a date part and return it as an Option.
fn parse_date_part<T: std::str::FromStr>(date_part_str: &str) -> Option<T> {
    date_part_str.trim().parse::<T>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dotted_date() {
        assert_eq!(
            parse_dotted_date("2024.01.02"),
            NaiveDate::from_ymd_opt(2024, 1, 2)
        );
        assert_eq!(
            parse_dotted_date(" 2023-12-28 "),
            NaiveDate::from_ymd_opt(2023, 12, 28)
        );
        assert_eq!(parse_dotted_date("2024.13.02"), None);
        assert_eq!(parse_dotted_date("날짜"), None);
        assert_eq!(parse_dotted_date(""), None);
    }

    #[test]
    fn test_ymd_clamped() {
        assert_eq!(ymd_clamped(2024, 2, 31), NaiveDate::from_ymd_opt(2024, 2, 29));
        assert_eq!(ymd_clamped(2023, 2, 29), NaiveDate::from_ymd_opt(2023, 2, 28));
        assert_eq!(ymd_clamped(2024, 12, 31), NaiveDate::from_ymd_opt(2024, 12, 31));
        assert_eq!(ymd_clamped(2024, 4, 31), NaiveDate::from_ymd_opt(2024, 4, 30));
        assert_eq!(ymd_clamped(2024, 13, 1), None);
    }

    #[test]
    fn test_now_minute() {
        assert_eq!(now_minute().len(), "2024-01-01 09:00".len());
    }
}
