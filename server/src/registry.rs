use bootprobe::{NodeId, Opcode, Reply, Request};
use dashmap::DashMap;

/// Running flag per registered node. Nodes never registered are absent and
/// every request for them fails.
#[derive(Debug, Default)]
pub struct Registry {
    nodes: DashMap<NodeId, bool>,
}

impl Registry {
    pub fn register(&self, node: NodeId) {
        self.nodes.entry(node).or_insert(false);
        tracing::info!(%node, "Registered node");
    }

    #[cfg(test)]
    fn is_running(&self, node: NodeId) -> Option<bool> {
        self.nodes.get(&node).map(|running| *running)
    }

    pub fn handle(&self, request: Request) -> Reply {
        let Request { opcode, node } = request;
        let succeeded = match self.nodes.get_mut(&node) {
            None => {
                tracing::info!(%node, %opcode, "Node not registered");
                false
            }
            Some(mut running) => {
                let target = opcode == Opcode::RunNode;
                if *running == target {
                    tracing::info!(%node, %opcode, running = target, "Node already in requested state");
                } else {
                    *running = target;
                    tracing::info!(%node, %opcode, running = target, "Node state changed");
                }
                true
            }
        };
        Reply::new(opcode, node, succeeded)
    }
}
