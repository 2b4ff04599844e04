/// 上市公司名單
pub mod listing;
