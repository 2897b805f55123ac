use std::error::Error;

use tokio::net::UdpSocket;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod config;
mod forwarder;
mod resolver;
mod transport;

use config::Config;

use crate::resolver::udp_listener_loop;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::load();

    let socket = UdpSocket::bind(config.listen).await?;
    info!(
        listen = %config.listen,
        resolver = %config.upstream.address,
        "forwarding DNS queries"
    );

    tokio::select! {
        result = udp_listener_loop(&socket, &config.upstream) => {
            if let Err(e) = &result {
                error!(error = %e, "listening socket failed");
            }
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutting down");
        }
    }

    Ok(())
}
