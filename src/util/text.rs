use std::{collections::HashSet, str::FromStr};

use anyhow::{anyhow, Result};
use encoding_rs::EUC_KR;

use crate::logging;

const NUMBER_ESCAPE_CHAR: &[char] = &['원', '%', ',', ' ', '"', '\n', '\t', '\u{a0}'];

/// Converts an EUC-KR encoded byte slice to a UTF-8 `String`.
///
/// KIND 與 Naver 金融的頁面皆以 EUC-KR 輸出，`reqwest` 無法從標頭判斷時需強制轉碼。
///
/// 無法對應的位元組以 U+FFFD 取代，不視為錯誤。
pub fn euc_kr_2_utf8(data: &[u8]) -> String {
    let (text, _, had_errors) = EUC_KR.decode(data);
    if had_errors {
        logging::debug_file_async(format!(
            "EUC_KR.decode replaced malformed bytes in {} bytes",
            data.len()
        ));
    }

    text.into_owned()
}

/// Parses an `i64` value from a given string.
///
/// Thousands separators and the escape characters in `NUMBER_ESCAPE_CHAR`
/// are removed before parsing, so `"1,234,500"` becomes `1234500`.
///
/// # Arguments
///
/// * `s`: A string slice containing the representation of an `i64` number.
/// * `escape_chars`: A list of additional characters to be removed from the
///   string before parsing.
///
/// # Example
///
/// ```ignore
/// let v = parse_i64("1,234", None).unwrap();
/// assert_eq!(v, 1234);
/// ```
pub fn parse_i64(s: &str, escape_chars: Option<Vec<char>>) -> Result<i64> {
    let cleaned = clean_escape_chars(s, escape_chars);
    i64::from_str(&cleaned)
        .map_err(|why| anyhow!("Failed to parse '{}' as i64 because: {:?}", cleaned, why))
}

/// 將代號補零至指定長度，例︰930 => 000930
pub fn zero_pad(code: &str, width: usize) -> String {
    format!("{:0>width$}", code.trim(), width = width)
}

/// Removes a set of escape characters from a given string.
pub(crate) fn clean_escape_chars(s: &str, escape_chars: Option<Vec<char>>) -> String {
    let mut combined: Vec<char> = NUMBER_ESCAPE_CHAR.to_vec();
    if let Some(ec) = escape_chars {
        combined.extend(ec);
    }

    let filters = combined.iter().collect::<HashSet<_>>();
    s.chars().filter(|c| !filters.contains(c)).collect()
}

#[cfg(test)]
mod tests {
    // 注意這個慣用法：在 tests 模組中，從外部範疇匯入所有名字。
    use super::*;

    #[test]
    fn test_euc_kr_2_utf8() {
        let (bytes, _, _) = EUC_KR.encode("종목코드 회사명");
        assert_eq!(euc_kr_2_utf8(&bytes), "종목코드 회사명");
    }

    #[test]
    fn test_parse_i64() {
        assert_eq!(parse_i64("71,200", None).unwrap(), 71200);
        assert_eq!(parse_i64(" 12,345,678 ", None).unwrap(), 12345678);
        assert!(parse_i64("", None).is_err());
        assert!(parse_i64("N/A", None).is_err());
    }

    #[test]
    fn test_zero_pad() {
        assert_eq!(zero_pad("930", 6), "000930");
        assert_eq!(zero_pad("005930", 6), "005930");
    }

    #[test]
    fn test_clean_escape_chars() {
        let result = clean_escape_chars("1,000원 %", Some(vec!['*']));
        assert_eq!(result, "1000");
    }
}
