use anyhow::Context;
use stakemate_server::{api, config::Config, Server};
use std::net::SocketAddr;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("invalid listen addr")?;
    if config.test_mode {
        info!("TEST MODE: payment verification and transfers are bypassed");
    }

    let server = Server::new(config);
    let app = api::router(server);

    info!(%addr, "stakemate server listening");
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;
    Ok(())
}
