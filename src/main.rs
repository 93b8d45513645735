use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod error;
mod state;
mod db;
mod routes;
mod views;
mod crypto {
    pub mod aes;
}

mod models {
    pub mod user;
    pub mod session;
}

mod repositories {
    pub mod user;
    #[cfg(test)]
    pub mod memory;
}

mod services {
    pub mod credentials;
    pub mod session;
}

mod handlers {
    pub mod auth;
    pub mod home;
}

mod middleware_layer {
    pub mod auth;
}

mod validation {
    pub mod auth;
}

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Refusing to start: {:#}", e);
            return Err(e);
        }
    };
    tracing::info!("✅ Configuration loaded successfully");

    let state = AppState::new(&config).await?;
    tracing::info!("✅ AppState initialized");

    let app = routes::build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("🚀 Server listening on http://{}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
