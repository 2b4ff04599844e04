/// 日別時勢（每日股價）
pub mod daily_price;
