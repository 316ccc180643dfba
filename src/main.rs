use trellis_api::{app::app, config, hooks};

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, AUTH_* secrets, etc.
    let _ = dotenvy::dotenv();

    // Initialize configuration (this loads the config singleton)
    let config = config::config();
    tracing::info!("Starting Trellis API in {:?} mode", config.environment);

    tracing_subscriber::fmt::init();

    // Register auto-populated entity columns before any write can run
    hooks::preset::install(hooks::default_preset_fields());

    let app = app();

    // Allow tests or deployments to override port via env
    let port = std::env::var("TRELLIS_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    println!("🚀 Trellis API server listening on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("server");
}
