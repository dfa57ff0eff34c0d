pub mod avoidance;
pub mod infection;
pub mod movement;
pub mod snapshot;

use crate::agent::{Agent, AgentSnapshot, HealthCounts};
use crate::config::SimConfig;
use crate::util::timer::{SystemPhase, SystemTimers};
use infection::{InfectionBuffers, InfectionReport};

/// Outcome of one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub counts: HealthCounts,
    pub infection: InfectionReport,
}

/// Run all simulation systems for one tick.
pub fn tick(
    agents: &mut [Agent],
    config: &SimConfig,
    rng: &mut fastrand::Rng,
    snapshots: &mut Vec<AgentSnapshot>,
    infection_bufs: &mut InfectionBuffers,
    timers: &mut SystemTimers,
) -> TickReport {
    // 1. Freeze tick-start state
    timers.begin();
    snapshot::rebuild(agents, snapshots);
    timers.end(SystemPhase::Snapshot);

    // 2. Social distancing against the snapshot
    timers.begin();
    avoidance::update(agents, snapshots, config);
    timers.end(SystemPhase::Avoidance);

    // 3. Infection aging, recovery and transmission
    timers.begin();
    let infection = infection::update(agents, snapshots, config, rng, infection_bufs);
    timers.end(SystemPhase::Infection);

    // 4. Movement integration with wall reflection
    timers.begin();
    movement::integrate(agents, config);
    timers.end(SystemPhase::Movement);

    // 5. Census for reporting
    timers.begin();
    let counts = HealthCounts::tally(agents.iter().map(|a| &a.health));
    timers.end(SystemPhase::Census);

    TickReport { counts, infection }
}
