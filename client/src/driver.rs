use crate::{
    config::Config,
    session::{self, Response, Session},
};
use bootprobe::{render_hex, Opcode, Reply, Request};
use std::io::{self, Write};

/// Exchanges run in this order, each one regardless of how the previous went.
pub const SEQUENCE: [Opcode; 2] = [Opcode::RunNode, Opcode::StopNode];

#[derive(Debug)]
pub struct Report {
    pub opcode: Opcode,
    pub outcome: Result<Response, session::Error>,
}

impl Report {
    pub fn render(&self, colored: bool) -> String {
        let (prefix, rest, style) = match &self.outcome {
            Ok(Response::Bytes(bytes)) => (
                format!("{} response:", self.opcode.short_name()),
                format!(" {}", render_hex(bytes)),
                console::Style::new().green(),
            ),
            Ok(Response::Timeout) => (
                format!("No response to {}", self.opcode),
                " (timeout)".to_string(),
                console::Style::new().yellow(),
            ),
            Err(err) => (
                format!("Transport error on {}:", self.opcode),
                format!(" {}", err),
                console::Style::new().red(),
            ),
        };
        format!("{}{}", style.force_styling(colored).apply_to(prefix), rest)
    }
}

pub struct Driver {
    config: Config,
    session: Session,
    colored: bool,
}

impl Driver {
    pub fn new(config: Config) -> Self {
        let session = config.session();
        Self {
            config,
            session,
            colored: false,
        }
    }

    pub fn colored(mut self, colored: bool) -> Self {
        self.colored = colored;
        self
    }

    /// Runs [`SEQUENCE`] against the configured destination, writing the
    /// report to `out` as each exchange finishes.
    pub async fn run(&self, mut out: impl Write) -> io::Result<Vec<Report>> {
        writeln!(
            out,
            "Testing Bootstrap at {}:{} for node {}",
            self.config.host, self.config.port, self.config.node
        )?;

        let mut reports = Vec::with_capacity(SEQUENCE.len());
        for (i, opcode) in SEQUENCE.iter().copied().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.config.pause).await;
            }
            writeln!(out, "\n-> Sending {}", opcode)?;
            out.flush()?;

            let report = self.exchange(opcode).await;
            writeln!(out, "{}", report.render(self.colored))?;
            out.flush()?;
            reports.push(report);
        }

        writeln!(out, "\nDone")?;
        out.flush()?;
        Ok(reports)
    }

    #[tracing::instrument(skip(self), fields(node = %self.config.node))]
    async fn exchange(&self, opcode: Opcode) -> Report {
        let request = Request::new(opcode, self.config.node);
        tracing::debug!(%request, "Sending request");
        let outcome = self.session.exchange(&request.encode()).await;
        match &outcome {
            Ok(Response::Bytes(bytes)) => {
                tracing::info!("Received {} byte reply", bytes.len());
                match Reply::parse(bytes) {
                    Ok(reply) => tracing::debug!(%reply, "Decoded reply"),
                    Err(err) => tracing::debug!(%err, "Reply does not match the bootstrap layout"),
                }
            }
            Ok(Response::Timeout) => tracing::warn!("No reply before deadline"),
            Err(err) => tracing::warn!(%err, "Exchange failed"),
        }
        Report { opcode, outcome }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::tests::{silent_peer, SLACK};
    use bootprobe::NodeId;
    use bytes::Bytes;
    use std::{
        net::SocketAddr,
        time::{Duration, Instant},
    };
    use tokio::net::UdpSocket;

    fn config(address: SocketAddr, deadline: Duration, pause: Duration) -> Config {
        Config {
            host: address.ip().to_string(),
            port: address.port(),
            node: NodeId(1),
            deadline,
            pause,
            verify_source: false,
        }
    }

    #[tokio::test]
    async fn silent_peer_times_out_twice() {
        let peer = silent_peer().await;
        let address = peer.local_addr().unwrap();
        let driver = Driver::new(config(
            address,
            Duration::from_millis(200),
            Duration::from_millis(100),
        ));

        let started = Instant::now();
        let mut out = Vec::new();
        let reports = driver.run(&mut out).await.unwrap();
        let elapsed = started.elapsed();

        assert!(elapsed >= Duration::from_millis(500), "finished after {:?}", elapsed);
        assert!(elapsed <= Duration::from_millis(500) + SLACK * 2, "finished after {:?}", elapsed);

        let opcodes: Vec<_> = reports.iter().map(|report| report.opcode).collect();
        assert_eq!(opcodes, SEQUENCE);
        assert!(reports
            .iter()
            .all(|report| matches!(report.outcome, Ok(Response::Timeout))));

        let expected = format!(
            "Testing Bootstrap at 127.0.0.1:{} for node 1\n\
             \n-> Sending RUN_NODE_REQUEST\n\
             No response to RUN_NODE_REQUEST (timeout)\n\
             \n-> Sending STOP_NODE_REQUEST\n\
             No response to STOP_NODE_REQUEST (timeout)\n\
             \nDone\n",
            address.port()
        );
        assert_eq!(String::from_utf8(out).unwrap(), expected);
    }

    #[tokio::test]
    async fn bootstrap_replies_are_hex_dumped() {
        let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let address = peer.local_addr().unwrap();
        let received = tokio::spawn(async move {
            let mut received = Vec::new();
            for _ in 0..SEQUENCE.len() {
                let mut buf = [0; 8];
                let (n, from) = peer.recv_from(&mut buf).await.unwrap();
                let request = Request::deserialize(&buf[..n]).unwrap();
                let reply = Reply::new(request.opcode, request.node, true);
                peer.send_to(&reply.to_bytes(), from).await.unwrap();
                received.push(buf[..n].to_vec());
            }
            received
        });

        let mut out = Vec::new();
        let reports = Driver::new(config(
            address,
            Duration::from_secs(2),
            Duration::from_millis(10),
        ))
        .run(&mut out)
        .await
        .unwrap();

        assert_eq!(received.await.unwrap(), [[0x7B, 0x01], [0x7D, 0x01]]);
        assert!(matches!(
            &reports[0].outcome,
            Ok(Response::Bytes(bytes)) if bytes == &Bytes::from_static(&[0x7C, 0x01, 0x01])
        ));
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("RUN response: 0x7c 0x01 0x01\n"));
        assert!(out.contains("STOP response: 0x7e 0x01 0x01\n"));
    }

    #[tokio::test]
    async fn stop_runs_after_failed_run() {
        let mut config = Config::default();
        config.host = "255.255.255.255".to_string();
        config.deadline = Duration::from_millis(50);
        config.pause = Duration::from_millis(10);

        let mut out = Vec::new();
        let reports = Driver::new(config).run(&mut out).await.unwrap();

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[1].opcode, Opcode::StopNode);
        assert!(reports.iter().all(|report| report.outcome.is_err()));
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("Transport error on RUN_NODE_REQUEST: "));
        assert!(out.contains("Transport error on STOP_NODE_REQUEST: "));
        assert!(out.ends_with("\nDone\n"));
    }

    #[test]
    fn render() {
        let report = Report {
            opcode: Opcode::StopNode,
            outcome: Ok(Response::Bytes(Bytes::new())),
        };
        assert_eq!(report.render(false), "STOP response: ");

        let report = Report {
            opcode: Opcode::RunNode,
            outcome: Ok(Response::Timeout),
        };
        let colored = report.render(true);
        assert!(colored.contains("\u{1b}["));
        assert!(colored.ends_with(" (timeout)"));
    }
}
