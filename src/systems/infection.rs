use crate::agent::{Agent, AgentSnapshot, HealthState, InfectionProgress};
use crate::config::SimConfig;

/// Pre-allocated, reused each tick.
pub struct InfectionBuffers {
    /// Snapshot indices of agents that lost a transmission trial this tick.
    exposed: Vec<usize>,
}

impl InfectionBuffers {
    pub fn new(capacity: usize) -> Self {
        Self {
            exposed: Vec::with_capacity(capacity),
        }
    }
}

/// What changed during one infection pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InfectionReport {
    pub new_infections: usize,
    pub recoveries: usize,
}

/// Run the infection pass.
///
/// Only agents that were Infected in the tick-start snapshot act as sources,
/// and only agents Healthy in the snapshot are eligible targets. Successful
/// trials are collected first and applied afterwards, so an agent infected
/// this tick neither ages nor transmits until the next tick.
pub fn update(
    agents: &mut [Agent],
    snapshots: &[AgentSnapshot],
    config: &SimConfig,
    rng: &mut fastrand::Rng,
    bufs: &mut InfectionBuffers,
) -> InfectionReport {
    let mut report = InfectionReport::default();
    bufs.exposed.clear();

    for (i, snap) in snapshots.iter().enumerate() {
        if snap.health != HealthState::Infected {
            continue;
        }
        let progress = agents[i].advance_infection_and_transmit(
            i,
            snapshots,
            config,
            rng,
            &mut bufs.exposed,
        );
        if progress == InfectionProgress::Recovered {
            report.recoveries += 1;
        }
    }

    for &target in &bufs.exposed {
        if agents[target].infect() {
            report.new_infections += 1;
        }
    }

    report
}
