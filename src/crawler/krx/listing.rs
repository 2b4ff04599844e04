use anyhow::{anyhow, Result};
use scraper::Html;

use crate::util::{self, http::element, text};

/// 代號欄位的標題
const CODE_HEADER: &str = "종목코드";
/// 公司名稱欄位的標題
const NAME_HEADER: &str = "회사명";
const CODE_WIDTH: usize = 6;

/// KIND 上市公司名單中的一筆資料
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    /// 補零至六碼的代號
    pub code: String,
    pub name: String,
}

/// 下載上市公司名單
///
/// # Errors
///
/// 網路錯誤或表格結構改變（找不到代號、名稱欄位）時回傳錯誤。
pub async fn visit(url: &str) -> Result<Vec<Listing>> {
    let text = util::http::get_use_euc_kr(url).await?;
    parse(&text)
}

/// 解析名單頁面的第一個表格，依標題找出代號與名稱欄位。
pub(crate) fn parse(html: &str) -> Result<Vec<Listing>> {
    let document = Html::parse_document(html);
    let rows = element::parse_table(&document, "table")?;
    let header = rows
        .first()
        .ok_or_else(|| anyhow!("The listing table is empty"))?;
    let code_index = column_index(header, CODE_HEADER)?;
    let name_index = column_index(header, NAME_HEADER)?;

    let listings = rows
        .iter()
        .skip(1)
        .filter_map(|cells| {
            let code = cells.get(code_index)?.trim();
            let name = cells.get(name_index)?.trim();
            if code.is_empty() || name.is_empty() || !code.chars().all(|c| c.is_ascii_alphanumeric())
            {
                return None;
            }

            Some(Listing {
                code: text::zero_pad(code, CODE_WIDTH),
                name: name.to_string(),
            })
        })
        .collect();

    Ok(listings)
}

fn column_index(header: &[String], title: &str) -> Result<usize> {
    header
        .iter()
        .position(|h| h == title)
        .ok_or_else(|| anyhow!("The column '{}' not found in the listing table", title))
}

#[cfg(test)]
pub(crate) mod tests {
    use encoding_rs::EUC_KR;

    // 注意這個慣用法：在 tests 模組中，從外部範疇匯入所有名字。
    use super::*;

    /// 依 KIND 下載檔的格式產生名單頁面
    pub(crate) fn listing_html(companies: &[(&str, &str)]) -> String {
        let mut html = String::from(
            r#"<html><head><meta http-equiv="Content-Type" content="text/html; charset=euc-kr"></head><body>
<table border="1">
<tr><th>회사명</th><th>시장구분</th><th>종목코드</th><th>업종</th></tr>
"#,
        );
        for (code, name) in companies {
            html.push_str(&format!(
                "<tr><td>{}</td><td>유가</td><td style=\"mso-number-format:'\\@';text-align:center;\">{}</td><td>전자</td></tr>\n",
                name, code
            ));
        }
        html.push_str("</table></body></html>");
        html
    }

    pub(crate) fn listing_body(companies: &[(&str, &str)]) -> Vec<u8> {
        let html = listing_html(companies);
        let (bytes, _, _) = EUC_KR.encode(&html);
        bytes.into_owned()
    }

    #[test]
    fn test_parse() {
        let html = listing_html(&[("005930", "삼성전자"), ("660", "SK하이닉스")]);
        let listings = parse(&html).unwrap();
        assert_eq!(
            listings,
            vec![
                Listing {
                    code: "005930".to_string(),
                    name: "삼성전자".to_string()
                },
                Listing {
                    code: "000660".to_string(),
                    name: "SK하이닉스".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_parse_skips_invalid_rows() {
        let html = listing_html(&[("", "빈코드"), ("00-1", "잘못된코드"), ("5930", "삼성전자")]);
        let listings = parse(&html).unwrap();
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].code, "005930");
    }

    #[test]
    fn test_parse_structure_changed() {
        let html = "<table><tr><th>이름</th><th>코드</th></tr><tr><td>a</td><td>1</td></tr></table>";
        assert!(parse(html).is_err());
        assert!(parse("<html><body><p>점검중</p></body></html>").is_err());
    }

    #[tokio::test]
    async fn test_visit() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/corpList.do")
            .with_status(200)
            .with_header("content-type", "application/vnd.ms-excel")
            .with_body(listing_body(&[("005930", "SamsungElec"), ("000660", "SKHynix")]))
            .create_async()
            .await;

        let listings = visit(&format!("{}/corpList.do", server.url()))
            .await
            .unwrap();
        assert_eq!(listings.len(), 2);
        assert_eq!(listings[1].name, "SKHynix");
    }

    #[tokio::test]
    async fn test_visit_unreachable() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/corpList.do")
            .with_status(503)
            .create_async()
            .await;

        assert!(visit(&format!("{}/corpList.do", server.url())).await.is_err());
    }
}
