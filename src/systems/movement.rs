use crate::agent::Agent;
use crate::config::SimConfig;

/// Integrate velocity into position for every agent, reflecting off walls.
pub fn integrate(agents: &mut [Agent], config: &SimConfig) {
    for agent in agents.iter_mut() {
        agent.integrate_motion(config.width, config.height);
    }
}
