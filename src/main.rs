//! Matchboard - 对局记录服务
//!
//! - Domain: user, team, match_log
//! - Application: ResourceManager 端口
//! - Infrastructure: http, persistence

use std::path::Path;

use anyhow::Context;
use matchboard::config::{load_config, print_config, LogConfig};
use matchboard::infrastructure::http::default_app;
use matchboard::infrastructure::persistence::sqlite::{
    create_pool, run_migrations, seed_users, DatabaseConfig, SqliteUserManager,
};
use tracing_subscriber::EnvFilter;

fn init_tracing(log: &LogConfig) {
    let log_filter = format!(
        "{},matchboard={},tower_http=debug",
        log.level, log.level
    );
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter));

    if log.json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config().context("Failed to load config")?;

    init_tracing(&config.log);

    tracing::info!("Matchboard - 对局记录服务");
    print_config(&config);

    // 确保数据目录存在
    if let Some(parent) = Path::new(&config.database.path).parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let db_config = DatabaseConfig {
        database_url: config.database.database_url(),
        max_connections: config.database.max_connections,
    };
    let pool = create_pool(&db_config).await?;
    run_migrations(&pool).await?;

    if let Some(seed_file) = &config.database.seed_file {
        let manager = SqliteUserManager::new(pool.clone());
        let inserted = seed_users(&manager, seed_file)
            .await
            .with_context(|| format!("Failed to seed users from {}", seed_file.display()))?;
        tracing::info!(inserted, "Seed data loaded");
    }

    let app = default_app(&config, pool).context("Failed to compose app")?;

    app.start_with_shutdown(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
        tracing::info!("Received shutdown signal");
    })
    .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}
