use crate::agent::{self, Agent, AgentSnapshot, HealthCounts};
use crate::config::SimConfig;
use crate::systems::{self, infection::InfectionBuffers, TickReport};
use crate::util::timer::SystemTimers;

/// How often (in ticks) to log a census at debug level.
const CENSUS_LOG_INTERVAL: u64 = 60;

/// The whole simulation state: a fixed, ordered set of agents plus the
/// scratch buffers and RNG that drive each tick.
pub struct Population {
    agents: Vec<Agent>,
    config: SimConfig,
    rng: fastrand::Rng,

    // Tick-start snapshot (pre-allocated, reused each tick)
    snapshots: Vec<AgentSnapshot>,
    infection_bufs: InfectionBuffers,

    counts: HealthCounts,
    tick_count: u64,
    outbreak_over: bool,

    /// Per-phase timers, read by the HUD.
    pub timers: SystemTimers,
}

impl Population {
    /// Spawn a fresh population from `config`. The config is trusted; the
    /// caller is expected to have run [`SimConfig::validate`].
    pub fn new(config: SimConfig) -> Self {
        let mut rng = config.rng();
        let agents = agent::spawn_population(&config, &mut rng);
        Self::from_agents(config, agents, rng)
    }

    /// Wrap an existing agent list.
    pub fn from_agents(config: SimConfig, agents: Vec<Agent>, rng: fastrand::Rng) -> Self {
        let capacity = agents.len();
        let counts = HealthCounts::tally(agents.iter().map(|a| &a.health));
        Self {
            agents,
            config,
            rng,
            snapshots: Vec::with_capacity(capacity),
            infection_bufs: InfectionBuffers::new(capacity),
            counts,
            tick_count: 0,
            outbreak_over: counts.infected == 0,
            timers: SystemTimers::new(),
        }
    }

    /// Advance every agent by one tick.
    pub fn step(&mut self) -> TickReport {
        let report = systems::tick(
            &mut self.agents,
            &self.config,
            &mut self.rng,
            &mut self.snapshots,
            &mut self.infection_bufs,
            &mut self.timers,
        );
        self.counts = report.counts;
        self.tick_count += 1;

        if report.infection.new_infections > 0 || report.infection.recoveries > 0 {
            log::trace!(
                "tick {}: +{} infected, +{} immune",
                self.tick_count,
                report.infection.new_infections,
                report.infection.recoveries,
            );
        }
        if self.tick_count % CENSUS_LOG_INTERVAL == 0 {
            log::debug!(
                "tick {} | healthy: {} | infected: {} | immune: {}",
                self.tick_count,
                self.counts.healthy,
                self.counts.infected,
                self.counts.immune,
            );
        }
        if !self.outbreak_over && self.counts.infected == 0 {
            self.outbreak_over = true;
            log::info!(
                "Outbreak over after {} ticks: {} never infected, {} immune",
                self.tick_count,
                self.counts.healthy,
                self.counts.immune,
            );
        }

        report
    }

    /// Agents in stable spawn order.
    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn counts(&self) -> HealthCounts {
        self.counts
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// True once no agent is infected any more.
    pub fn outbreak_over(&self) -> bool {
        self.outbreak_over
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::HealthState;
    use glam::Vec2;

    const EPS: f32 = 1e-4;

    fn seeded(config: SimConfig) -> Population {
        Population::new(SimConfig {
            seed: Some(0xC0FFEE),
            ..config
        })
    }

    #[test]
    fn two_agent_scenario() {
        let cfg = SimConfig {
            population: 2,
            infection_radius: 30.0,
            infection_chance: 1.0,
            infection_duration: 200,
            width: 800.0,
            height: 800.0,
            ..SimConfig::default()
        };
        let agents = vec![
            Agent::new(Vec2::new(0.0, 0.0), Vec2::ZERO, HealthState::Infected),
            Agent::new(Vec2::new(5.0, 0.0), Vec2::ZERO, HealthState::Healthy),
        ];
        let mut pop = Population::from_agents(cfg, agents, fastrand::Rng::with_seed(1));

        let report = pop.step();
        let agents = pop.agents();
        assert_eq!(agents[1].health, HealthState::Infected);
        assert_eq!(agents[1].infection_age, 0);
        assert_eq!(agents[0].infection_age, 1);
        assert_eq!(report.infection.new_infections, 1);
        assert_eq!(
            pop.counts(),
            HealthCounts {
                healthy: 0,
                infected: 2,
                immune: 0
            }
        );
        assert_eq!(pop.tick_count(), 1);
    }

    #[test]
    fn speed_never_exceeds_max() {
        let mut pop = seeded(SimConfig {
            population: 80,
            ..SimConfig::default()
        });
        let max = pop.config().max_speed;
        for _ in 0..600 {
            pop.step();
            for a in pop.agents() {
                assert!(a.speed() <= max + EPS, "speed {} > {}", a.speed(), max);
            }
        }
    }

    #[test]
    fn health_only_moves_forward() {
        let mut pop = seeded(SimConfig {
            population: 60,
            infection_chance: 0.5,
            infection_duration: 40,
            ..SimConfig::default()
        });
        let mut prev: Vec<(HealthState, u32)> =
            pop.agents().iter().map(|a| (a.health, a.infection_age)).collect();

        for _ in 0..400 {
            pop.step();
            for (a, (was, age)) in pop.agents().iter().zip(prev.iter()) {
                assert!(was.may_become(a.health), "{was:?} -> {:?}", a.health);
                match a.health {
                    HealthState::Infected if *was == HealthState::Infected => {
                        assert_eq!(a.infection_age, age + 1)
                    }
                    _ => assert!(a.health == HealthState::Infected || a.infection_age == 0),
                }
            }
            prev = pop.agents().iter().map(|a| (a.health, a.infection_age)).collect();
        }
    }

    #[test]
    fn no_transmission_means_monotone_counts() {
        let mut pop = seeded(SimConfig {
            population: 40,
            infection_chance: 0.0,
            infection_duration: 30,
            ..SimConfig::default()
        });
        let start = pop.counts();
        let mut prev = start;
        for _ in 0..100 {
            let counts = pop.step().counts;
            assert!(counts.infected <= prev.infected);
            assert!(counts.immune >= prev.immune);
            assert_eq!(counts.healthy, start.healthy);
            prev = counts;
        }
        assert_eq!(prev.infected, 0);
        assert_eq!(prev.immune, 1);
        assert!(pop.outbreak_over());
    }

    #[test]
    fn outbreak_over_only_once_no_one_is_infected() {
        let mut pop = seeded(SimConfig {
            population: 5,
            infection_chance: 0.0,
            infection_duration: 2,
            ..SimConfig::default()
        });
        assert!(!pop.outbreak_over());
        pop.step();
        pop.step();
        assert!(!pop.outbreak_over(), "still infected at the duration");
        pop.step();
        assert!(pop.outbreak_over());
        assert_eq!(pop.counts().immune, 1);
    }

    #[test]
    fn certain_transmission_across_whole_arena() {
        let cfg = SimConfig {
            population: 30,
            infection_chance: 1.0,
            // covers the 800x800 diagonal
            infection_radius: 2000.0,
            ..SimConfig::default()
        };
        let mut pop = seeded(cfg);
        let counts = pop.step().counts;
        assert_eq!(counts.healthy, 0);
        assert_eq!(counts.infected, 30);
    }

    #[test]
    fn population_size_is_fixed() {
        let mut pop = seeded(SimConfig::default());
        for _ in 0..50 {
            let counts = pop.step().counts;
            assert_eq!(counts.total(), pop.config().population);
            assert_eq!(pop.agents().len(), pop.config().population);
        }
    }

    #[test]
    fn same_seed_same_run() {
        let cfg = SimConfig {
            seed: Some(99),
            ..SimConfig::default()
        };
        let mut a = Population::new(cfg.clone());
        let mut b = Population::new(cfg);
        for _ in 0..200 {
            assert_eq!(a.step(), b.step());
        }
        assert_eq!(a.agents(), b.agents());
    }
}
