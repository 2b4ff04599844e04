use anyhow::{anyhow, Result};
use scraper::{Html, Selector};

/// 取得第一個符合 selector 的元素的屬性值
pub fn attribute_value(document: &Html, css_selector: &str, attr: &str) -> Option<String> {
    let selector = Selector::parse(css_selector).ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|e| e.value().attr(attr))
        .map(str::to_string)
}

/// 將 HTML 表格攤平成文字矩陣
///
/// 每個 `tr` 成為一列，列內依序收集 `th`、`td` 的文字（已 trim）。
/// 沒有任何儲存格的列（例如分隔線）會被略過。
///
/// # Errors
///
/// selector 不合法或找不到表格時回傳錯誤。
pub fn parse_table(document: &Html, table_selector: &str) -> Result<Vec<Vec<String>>> {
    let table_selector = Selector::parse(table_selector)
        .map_err(|why| anyhow!("Failed to Selector::parse because: {:?}", why))?;
    let tr_selector =
        Selector::parse("tr").map_err(|why| anyhow!("Failed to Selector::parse because: {:?}", why))?;
    let cell_selector = Selector::parse("th, td")
        .map_err(|why| anyhow!("Failed to Selector::parse because: {:?}", why))?;

    let table = document
        .select(&table_selector)
        .next()
        .ok_or_else(|| anyhow!("The table not found"))?;

    let rows = table
        .select(&tr_selector)
        .map(|tr| {
            tr.select(&cell_selector)
                .map(|cell| cell.text().collect::<String>().trim().to_string())
                .collect::<Vec<String>>()
        })
        .filter(|cells| !cells.is_empty())
        .collect();

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HTML: &str = r#"
<html><body>
<table class="quote">
  <tr><th>날짜</th><th>종가</th></tr>
  <tr><td colspan="2"></td></tr>
  <tr><td> 2024.01.02 </td><td>79,600</td></tr>
  <tr></tr>
</table>
<td class="pgRR"><a href="/item/sise_day.naver?code=005930&amp;page=681">맨뒤</a></td>
</body></html>
"#;

    #[test]
    fn test_parse_table() {
        let document = Html::parse_document(HTML);
        let rows = parse_table(&document, "table.quote").unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], vec!["날짜", "종가"]);
        assert_eq!(rows[1], vec![""]);
        assert_eq!(rows[2], vec!["2024.01.02", "79,600"]);
    }

    #[test]
    fn test_parse_table_not_found() {
        let document = Html::parse_document(HTML);
        assert!(parse_table(&document, "table.missing").is_err());
    }

    #[test]
    fn test_attribute_value() {
        let document = Html::parse_document(HTML);
        assert_eq!(
            attribute_value(&document, "a", "href").as_deref(),
            Some("/item/sise_day.naver?code=005930&page=681")
        );
        assert!(attribute_value(&document, "span", "href").is_none());
    }
}
