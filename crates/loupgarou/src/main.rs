use loupgarou::prelude::*;
use tracing_subscriber::EnvFilter;

const DEFAULT_PORT: &str = "3000";

/// `LOUPGAROU_ADDR` wins; otherwise `0.0.0.0:$PORT`.
fn bind_addr() -> String {
    if let Ok(addr) = std::env::var("LOUPGAROU_ADDR") {
        return addr;
    }
    let port = std::env::var("PORT").unwrap_or_else(|_| DEFAULT_PORT.to_string());
    format!("0.0.0.0:{port}")
}

#[tokio::main]
async fn main() -> Result<(), LoupGarouError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_target(false)
        .init();

    let addr = bind_addr();
    tracing::info!(%addr, "starting Loup-Garou server");

    let builder = LoupGarouServer::builder()
        .bind(&addr)
        .game_config(GameConfig::default());

    #[cfg(feature = "ipify")]
    let server = builder.resolver(IpifyResolver::new()?).build().await?;
    #[cfg(not(feature = "ipify"))]
    let server = builder.build().await?;

    server.run().await
}
