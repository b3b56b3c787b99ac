use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    fmt().with_env_filter(filter).init();

    // Startup banner at info level so something always prints at default verbosity
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    let config = quill::server::ServerConfig::from_env();
    info!(
        target: "quill",
        "quill starting: RUST_LOG='{}', http_port={}, db_root='{}', uploads='{}', allowed_origin='{}', admin_categories={}",
        rust_log,
        config.http_port,
        config.db_root,
        config.upload_root,
        config.allowed_origin,
        config.admin_categories
    );

    quill::server::run_with_config(config).await
}
