use anyhow::Result;
use datalayer::config::{EnvConnectionStrings, ManagerOptions};
use datalayer::db::{ConnectionManager, MySqlConnector, Readable};
use datalayer::logging::{ErrorLogConfig, FileErrorLog};
use serde_json::json;
use std::env;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use shopping::{account_dao, product_dao, report_failure, Account, Product};

fn main() -> Result<()> {
    // 로깅 초기화
    let filter = EnvFilter::from_default_env().add_directive(
        "info"
            .parse()
            .map_err(|e| anyhow::anyhow!("로깅 설정 파싱 실패: {e}"))?,
    );
    fmt().with_env_filter(filter).init();

    let source = EnvConnectionStrings::load();
    let error_log = Arc::new(FileErrorLog::new(ErrorLogConfig::from_env())?);

    let manager = Arc::new(
        ConnectionManager::new(Arc::new(source), Arc::new(MySqlConnector::new()))
            .with_options(ManagerOptions::from_env())
            .with_error_sink(error_log.clone()),
    );
    manager.configure("shopping")?;

    let email = env::var("SHOPPING_EMAIL").unwrap_or_else(|_| "account1@example.com".to_string());
    let password = env::var("SHOPPING_PASSWORD").unwrap_or_else(|_| "p".to_string());

    let accounts = account_dao(Arc::clone(&manager));
    let fetched: Option<Account> = match accounts.fetch(&[json!(email), json!(password)]) {
        Ok(fetched) => fetched,
        Err(e) => {
            report_failure(error_log.as_ref(), "계정 조회 실패", &e);
            return Err(e.into());
        }
    };
    match fetched {
        Some(account) => info!(email = %account.email, name = ?account.name, "계정 조회 성공"),
        None => warn!(email = %email, "계정을 찾을 수 없음"),
    }

    let products = product_dao(Arc::clone(&manager));
    let listed: datalayer::DalResult<Vec<Product>> = products.find_all();
    match listed {
        Ok(items) => info!(count = items.len(), "상품 목록 조회 완료"),
        Err(e) => report_failure(error_log.as_ref(), "상품 목록 조회 실패", &e),
    }

    manager.dispose()?;
    info!("종료");
    Ok(())
}
