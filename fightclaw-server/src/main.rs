use fightclaw_server::config::Config;
use fightclaw_server::db;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fightclaw_server=debug".into()),
        )
        .init();

    let config = Config::from_env();

    let pool = db::create_pool(&config.database_url)
        .await
        .expect("failed to create database pool");

    db::run_migrations(&pool)
        .await
        .expect("failed to run migrations");

    let port = config.port;
    let app = fightclaw_server::build_router(pool, config).await;

    let addr = format!("0.0.0.0:{port}");
    tracing::info!("starting fightclaw-server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind");

    axum::serve(listener, app).await.expect("server error");
}
