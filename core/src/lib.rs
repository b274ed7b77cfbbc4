pub mod reply;

pub use reply::Reply;

pub const PORT: u16 = 8080;

/// Largest reply the client reads; anything past this is truncated by the socket.
pub const MAX_DATAGRAM_SIZE: usize = 1024;

use bytes::Buf;
use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
pub enum DeserializeError {
    #[error("invalid opcode {0:#04x}")]
    InvalidOpcode(u8),

    #[error("invalid length: expected {expected} bytes, got {got}")]
    InvalidLength { expected: usize, got: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    RunNode = 0x7B,
    StopNode = 0x7D,
}

impl TryFrom<u8> for Opcode {
    type Error = DeserializeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x7B => Ok(Self::RunNode),
            0x7D => Ok(Self::StopNode),
            value => Err(DeserializeError::InvalidOpcode(value)),
        }
    }
}

impl Opcode {
    /// Identifier the Bootstrap service puts in the first byte of its reply.
    pub fn reply_id(self) -> u8 {
        match self {
            Opcode::RunNode => reply::RUN_NODE_REPLY,
            Opcode::StopNode => reply::STOP_NODE_REPLY,
        }
    }

    pub fn short_name(self) -> &'static str {
        match self {
            Opcode::RunNode => "RUN",
            Opcode::StopNode => "STOP",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Opcode::RunNode => f.write_str("RUN_NODE_REQUEST"),
            Opcode::StopNode => f.write_str("STOP_NODE_REQUEST"),
        }
    }
}

/// Single-byte node identifier. Opaque to the client.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u8);

impl FromStr for NodeId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u8>().map(Self)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Wire form of a request: `[opcode, node]`, no prefix, no checksum.
pub fn encode(opcode: Opcode, node: NodeId) -> [u8; Request::SIZE] {
    [opcode as u8, node.0]
}

/// Renders bytes as space separated `0x%02x` values, in order.
pub fn render_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 5);
    for (i, byte) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&format!("0x{:02x}", byte));
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request {
    pub opcode: Opcode,
    pub node: NodeId,
}

impl Request {
    pub const SIZE: usize = 2;

    pub fn new(opcode: Opcode, node: NodeId) -> Self {
        Self { opcode, node }
    }

    pub fn encode(&self) -> [u8; Self::SIZE] {
        encode(self.opcode, self.node)
    }

    pub fn deserialize(mut bytes: impl Buf) -> Result<Self, DeserializeError> {
        if bytes.remaining() != Self::SIZE {
            return Err(DeserializeError::InvalidLength {
                expected: Self::SIZE,
                got: bytes.remaining(),
            });
        }
        let opcode = Opcode::try_from(bytes.get_u8())?;
        let node = NodeId(bytes.get_u8());
        Ok(Self { opcode, node })
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] NODE_ID={}", self.opcode, self.node)
    }
}
