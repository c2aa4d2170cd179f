//! TalentIQ web server.
//!
//! Run with: cargo run -p talentiq-web

use std::net::SocketAddr;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = talentiq_common::Settings::load()?;
    let addr: SocketAddr = settings.server.bind_addr.parse()?;

    let state = talentiq_web::state::AppState::initialize(settings).await?;
    let app = talentiq_web::router::build_router(state);

    info!(%addr, "TalentIQ server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
