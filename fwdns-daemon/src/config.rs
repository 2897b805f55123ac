use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use clap::Parser;

use crate::forwarder::Upstream;

/// Forwarding DNS proxy: answers A queries by asking an upstream resolver.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Upstream resolver as ip:port
    #[arg(short, long, env = "FWDNS_RESOLVER")]
    pub resolver: SocketAddr,

    /// Address to listen on
    #[arg(short, long, env = "FWDNS_ADDRESS", default_value = "127.0.0.1")]
    pub address: IpAddr,

    /// UDP port to listen on
    #[arg(short, long, env = "FWDNS_PORT", default_value_t = 2053)]
    pub port: u16,

    /// Give up on an upstream reply after this many milliseconds
    #[arg(long, env = "FWDNS_UPSTREAM_TIMEOUT_MS")]
    pub timeout_ms: Option<u64>,
}

pub struct Config {
    pub listen: SocketAddr,
    pub upstream: Upstream,
}

impl Config {
    /// Reads the command line, falling back to the environment and a `.env` file.
    pub fn load() -> Self {
        dotenvy::dotenv().ok();
        Config::from(Args::parse())
    }
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Config {
            listen: SocketAddr::new(args.address, args.port),
            upstream: Upstream {
                address: args.resolver,
                timeout: args.timeout_ms.map(Duration::from_millis),
            },
        }
    }
}
