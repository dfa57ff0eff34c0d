use crate::agent::{Agent, AgentSnapshot};

/// Rebuild the tick-start snapshot from current agent state.
pub fn rebuild(agents: &[Agent], snapshots: &mut Vec<AgentSnapshot>) {
    snapshots.clear();
    snapshots.extend(agents.iter().map(Agent::snapshot));
}
