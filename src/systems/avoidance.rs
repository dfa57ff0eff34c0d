use crate::agent::{Agent, AgentSnapshot};
use crate::config::SimConfig;

/// Apply social-distancing nudges to every agent.
///
/// All reads go through `snapshots`, so the result does not depend on the
/// order agents are visited in.
pub fn update(agents: &mut [Agent], snapshots: &[AgentSnapshot], config: &SimConfig) {
    debug_assert_eq!(agents.len(), snapshots.len());
    for (i, agent) in agents.iter_mut().enumerate() {
        agent.compute_avoidance(i, snapshots, config);
    }
}
