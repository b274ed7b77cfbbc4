use bootprobe::MAX_DATAGRAM_SIZE;
use bytes::Bytes;
use std::{
    net::{Ipv4Addr, Ipv6Addr, SocketAddr},
    time::Duration,
};
use tokio::net::UdpSocket;

/// Outcome of one exchange that reached the point of waiting for a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// First datagram received, truncated to [`MAX_DATAGRAM_SIZE`].
    Bytes(Bytes),
    Timeout,
}

/// The local stack refused the exchange. Never produced for a missing reply.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    IO(#[from] std::io::Error),
    #[error("could not resolve {address}: {reason}")]
    Resolve { address: String, reason: String },
}

/// Sends one datagram per [`Session::exchange`] and waits a bounded time for
/// one datagram back. Each exchange binds its own ephemeral socket, which is
/// closed when the exchange returns or its future is dropped.
#[derive(Debug, Clone)]
pub struct Session {
    host: String,
    port: u16,
    deadline: Duration,
    verify_source: bool,
}

impl Session {
    pub fn new(host: impl Into<String>, port: u16, deadline: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            deadline,
            verify_source: false,
        }
    }

    /// Ignore datagrams that do not come from the destination address.
    pub fn verify_source(mut self, verify: bool) -> Self {
        self.verify_source = verify;
        self
    }

    #[tracing::instrument(level = "debug", skip(self, request), fields(host = %self.host, port = self.port))]
    pub async fn exchange(&self, request: &[u8]) -> Result<Response, Error> {
        let destination = self.resolve().await?;
        let socket = UdpSocket::bind(unspecified(&destination)).await?;
        tracing::debug!(local = %socket.local_addr()?, %destination, "Bound endpoint");

        socket.send_to(request, destination).await?;
        tracing::debug!("Sent {} bytes", request.len());

        let mut buf = vec![0; MAX_DATAGRAM_SIZE];
        match tokio::time::timeout(self.deadline, self.recv(&socket, destination, &mut buf)).await
        {
            Ok(n) => {
                let n = n?;
                Ok(Response::Bytes(Bytes::copy_from_slice(&buf[..n])))
            }
            Err(_) => {
                tracing::debug!(deadline = ?self.deadline, "No reply before deadline");
                Ok(Response::Timeout)
            }
        }
    }

    async fn resolve(&self) -> Result<SocketAddr, Error> {
        let address = format!("{}:{}", self.host, self.port);
        let mut addresses = tokio::net::lookup_host((self.host.as_str(), self.port))
            .await
            .map_err(|err| Error::Resolve {
                address: address.clone(),
                reason: err.to_string(),
            })?;
        pick(addresses).ok_or_else(|| Error::Resolve {
            address,
            reason: "no addresses returned".to_string(),
        })
    }

    async fn recv(
        &self,
        socket: &UdpSocket,
        destination: SocketAddr,
        buf: &mut [u8],
    ) -> Result<usize, Error> {
        loop {
            let (n, from) = match socket.recv_from(buf).await {
                Ok(received) => received,
                Err(err) if is_unreachable(&err) => {
                    tracing::debug!(%err, "Destination unreachable, still waiting");
                    continue;
                }
                Err(err) => return Err(err.into()),
            };
            if !self.verify_source || from == destination {
                tracing::debug!(%from, "Received {} bytes", n);
                return Ok(n);
            }
            tracing::debug!(%from, "Discarding datagram from unexpected sender");
        }
    }
}

/// First IPv4 address if there is one, since the Bootstrap service only
/// listens on IPv4.
fn pick(addresses: impl Iterator<Item = SocketAddr>) -> Option<SocketAddr> {
    let mut first = None;
    for address in addresses {
        if address.is_ipv4() {
            return Some(address);
        }
        first = first.or(Some(address));
    }
    first
}

/// ICMP port unreachable surfaced on the receive path. Some platforms report
/// it on unconnected sockets; a missing listener still has to end in a timeout.
fn is_unreachable(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        std::io::ErrorKind::ConnectionReset | std::io::ErrorKind::ConnectionRefused
    )
}

fn unspecified(destination: &SocketAddr) -> SocketAddr {
    match destination {
        SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
        SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
    }
}
