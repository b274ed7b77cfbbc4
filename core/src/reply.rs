//! Reply layout used by the Bootstrap service: `[reply_id, node, status]`.
//!
//! The client never rejects a reply for not matching this layout; it only uses
//! it to annotate what it received.

use crate::{DeserializeError, NodeId, Opcode};
use bytes::BufMut;
use std::fmt;

pub const RUN_NODE_REPLY: u8 = 0x7C;
pub const STOP_NODE_REPLY: u8 = 0x7E;

pub const STATUS_FAILED: u8 = 0x00;
pub const STATUS_OK: u8 = 0x01;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reply {
    /// Request this reply answers.
    pub opcode: Opcode,
    pub node: NodeId,
    pub status: u8,
}

impl Reply {
    pub const SIZE: usize = 3;

    pub fn new(opcode: Opcode, node: NodeId, succeeded: bool) -> Self {
        let status = if succeeded { STATUS_OK } else { STATUS_FAILED };
        Self {
            opcode,
            node,
            status,
        }
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, DeserializeError> {
        let (id, node, status) = match *bytes {
            [id, node, status] => (id, node, status),
            _ => {
                return Err(DeserializeError::InvalidLength {
                    expected: Self::SIZE,
                    got: bytes.len(),
                })
            }
        };
        let opcode = match id {
            RUN_NODE_REPLY => Opcode::RunNode,
            STOP_NODE_REPLY => Opcode::StopNode,
            id => return Err(DeserializeError::InvalidOpcode(id)),
        };
        Ok(Self {
            opcode,
            node: NodeId(node),
            status,
        })
    }

    pub fn succeeded(&self) -> bool {
        self.status == STATUS_OK
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        [self.opcode.reply_id(), self.node.0, self.status]
    }

    pub fn serialize(&self, mut buf: impl BufMut) {
        buf.put_slice(&self.to_bytes());
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.opcode {
            Opcode::RunNode => "RUN_NODE_RESPONSE",
            Opcode::StopNode => "STOP_NODE_RESPONSE",
        };
        write!(f, "[{}] NODE_ID={} STATUS={}", name, self.node, self.status)
    }
}
