/// 韓國交易所 KIND 上市公司目錄
pub mod krx;
/// Naver 金融
pub mod naver;
