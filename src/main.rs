use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::{database::PostgresSQL, query::MarketDb, updater::DbUpdater};

pub mod cache;
pub mod config;
pub mod crawler;
pub mod database;
pub mod logging;
pub mod progress;
pub mod query;
pub mod updater;
pub mod util;

#[cfg(all(target_os = "linux", target_env = "musl"))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(
    name = "krx_crawler",
    about = "KRX 上市公司名單與 Naver 日別時勢寫入 PostgreSQL"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// 更新名單後下載指定股票的每日股價
    Price {
        /// 六碼股票代號，例︰005930
        code: String,
        /// 最多下載幾頁，未指定或為 0 時下載全部
        #[arg(long)]
        pages: Option<usize>,
    },
    /// 查詢已寫入的每日股價
    Query {
        /// 股票代號或公司名稱
        code_or_name: String,
        /// 起始日，預設為 365 天前
        #[arg(long)]
        start: Option<String>,
        /// 結束日，預設為今天
        #[arg(long)]
        end: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    let db = match PostgresSQL::open(&config::SETTINGS.postgresql.url()).await {
        Ok(db) => db,
        Err(why) => {
            logging::error_file_async(format!("krx_crawler failed because {:?}", why));
            logging::flush();
            return Err(why);
        }
    };

    let result = run(&db, cli.command).await;
    if let Err(why) = &result {
        logging::error_file_async(format!("krx_crawler failed because {:?}", why));
    }

    db.close().await;
    util::http::flush_log();
    logging::flush();
    result
}

async fn run(db: &PostgresSQL, command: Option<Commands>) -> Result<()> {
    match command {
        None => {
            let updater = DbUpdater::new(db, config::SETTINGS.crawler.clone());
            let rows = updater.refresh_companies().await?;
            logging::info_console(format!(
                "company_inform: {} rows written, {} companies cached",
                rows,
                updater.cache().len()
            ));
        }
        Some(Commands::Price { code, pages }) => {
            let updater = DbUpdater::new(db, config::SETTINGS.crawler.clone());
            let rows = updater.set_stock(&code, pages).await?;
            logging::info_console(format!("daily_price({}): {} rows written", code, rows));
        }
        Some(Commands::Query {
            code_or_name,
            start,
            end,
        }) => {
            let market = MarketDb::new(db).await?;
            match market
                .get_daily_price(&code_or_name, start.as_deref(), end.as_deref())
                .await
            {
                Ok(rows) => {
                    if rows.is_empty() {
                        logging::info_console(format!("{} has no daily price", code_or_name));
                    }
                    for (date, row) in rows {
                        println!(
                            "{} {} {} {} {} {} {}",
                            date, row.code, row.open, row.high, row.low, row.close, row.volume
                        );
                    }
                }
                Err(why) => logging::error_console(why.to_string()),
            }
        }
    }

    Ok(())
}
