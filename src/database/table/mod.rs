/// 上市公司代號與名稱
pub mod company_inform;
/// 每日股價（OHLCV）
pub mod daily_price;
