use crate::session::Session;
use bootprobe::NodeId;
use std::time::Duration;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_NODE: NodeId = NodeId(1);
pub const DEFAULT_DEADLINE_MS: u64 = 2000;
pub const DEFAULT_PAUSE_MS: u64 = 500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub node: NodeId,
    /// How long each exchange waits for a reply.
    pub deadline: Duration,
    /// Pause between consecutive exchanges.
    pub pause: Duration,
    /// Only accept replies sent from the destination address.
    pub verify_source: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: bootprobe::PORT,
            node: DEFAULT_NODE,
            deadline: Duration::from_millis(DEFAULT_DEADLINE_MS),
            pause: Duration::from_millis(DEFAULT_PAUSE_MS),
            verify_source: false,
        }
    }
}

impl Config {
    pub fn session(&self) -> Session {
        Session::new(self.host.clone(), self.port, self.deadline).verify_source(self.verify_source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.node, NodeId(1));
        assert_eq!(config.deadline, Duration::from_secs(2));
        assert_eq!(config.pause, Duration::from_millis(500));
        assert!(!config.verify_source);
    }
}
