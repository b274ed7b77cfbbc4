mod registry;

use bootprobe::{NodeId, Reply, Request, MAX_DATAGRAM_SIZE, PORT};
use bytes::BytesMut;
use clap::Parser;
use registry::Registry;
use std::net::{IpAddr, SocketAddr};
use tokio::net::UdpSocket;

#[derive(Parser, Debug)]
#[command(author, version, about = "Stub Bootstrap service answering RUN_NODE and STOP_NODE requests", long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(default_value = "127.0.0.1")]
    host: IpAddr,

    /// UDP port to listen on
    #[arg(default_value_t = PORT)]
    port: u16,

    /// Node to register, may be repeated
    #[arg(long = "node", default_values_t = [NodeId(1)])]
    nodes: Vec<NodeId>,
}

#[derive(Debug, thiserror::Error)]
enum Error {
    #[error("io: {0}")]
    IO(#[from] std::io::Error),
}

struct Server {
    registry: Registry,
    socket: UdpSocket,
}

impl Server {
    pub async fn bind(address: SocketAddr, registry: Registry) -> Result<Self, Error> {
        let socket = UdpSocket::bind(address).await?;
        Ok(Self { registry, socket })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, Error> {
        Ok(self.socket.local_addr()?)
    }

    pub async fn run(self) -> Result<(), Error> {
        let mut buf = vec![0; MAX_DATAGRAM_SIZE];
        let mut out = BytesMut::with_capacity(Reply::SIZE);
        loop {
            let (n, from) = self.socket.recv_from(&mut buf).await?;
            if n == 0 {
                tracing::debug!("received empty packet, skipping");
                continue;
            }
            if let Some(reply) = self.handle(&buf[..n], from) {
                tracing::debug!(%reply, "Sending response");
                out.clear();
                reply.serialize(&mut out);
                if let Err(err) = self.socket.send_to(&out, from).await {
                    tracing::warn!(%from, %err, "Failed to send response");
                }
            }
        }
    }

    #[tracing::instrument(skip(self, bytes))]
    fn handle(&self, bytes: &[u8], from: SocketAddr) -> Option<Reply> {
        match Request::deserialize(bytes) {
            Ok(request) => {
                tracing::debug!(%request, "Received");
                Some(self.registry.handle(request))
            }
            Err(err) => {
                tracing::info!(%err, "Received unknown datagram ({} bytes), ignoring", bytes.len());
                None
            }
        }
    }
}

fn init_logging() {
    const LOG_ENV: &str = "RUST_LOG";
    use std::str::FromStr;
    use tracing::Level;
    use tracing_subscriber::EnvFilter;

    let filter = std::env::var(LOG_ENV)
        .map(|env| {
            EnvFilter::from_str(env.as_str())
                .unwrap_or_else(|err| panic!("invalid `{}` environment variable {}", LOG_ENV, err))
        })
        .unwrap_or_else(|_| EnvFilter::default().add_directive(Level::INFO.into()));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    let args = Args::parse();

    let registry = Registry::default();
    for node in args.nodes {
        registry.register(node);
    }
    let server = Server::bind(SocketAddr::new(args.host, args.port), registry).await?;
    tracing::info!(address = %server.local_addr()?, "Starting server");
    server.run().await?;
    Ok(())
}
