mod client;
mod config;
mod demo;
mod facade;
mod services;
mod state;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = match config::AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            std::process::exit(1);
        }
    };

    let store = services::store::MemoryStore::new(config.engine.stale_lock_ms);
    tracing::info!(
        canvas_width = config.engine.canvas_width,
        canvas_height = config.engine.canvas_height,
        demo_shapes = config.demo_shapes,
        "sharedcanvas demo starting"
    );

    if let Err(e) = demo::run(store, config).await {
        tracing::error!(error = %e, "demo failed");
        std::process::exit(1);
    }
}
