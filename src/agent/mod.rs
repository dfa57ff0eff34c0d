pub mod health;

use glam::Vec2;

use crate::config::SimConfig;

pub use self::health::{HealthCounts, HealthState};

/// A single person moving around the arena.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Agent {
    /// Position in arena pixels. Not clamped; may overshoot an edge by one tick.
    pub pos: Vec2,
    /// Velocity in pixels/tick, magnitude <= `max_speed`.
    pub vel: Vec2,
    pub health: HealthState,
    /// Ticks since infection. Zero unless Infected.
    pub infection_age: u32,
}

/// Read-only view of an agent taken at the start of a tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentSnapshot {
    pub pos: Vec2,
    pub health: HealthState,
}

/// Result of advancing an agent's own infection by one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfectionProgress {
    /// Not infected; nothing happened.
    Unaffected,
    /// Still infected and able to transmit this tick.
    Contagious,
    /// Infection ran its course; now immune.
    Recovered,
}

impl Agent {
    pub fn new(pos: Vec2, vel: Vec2, health: HealthState) -> Self {
        Self {
            pos,
            vel,
            health,
            infection_age: 0,
        }
    }

    pub fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot {
            pos: self.pos,
            health: self.health,
        }
    }

    pub fn speed(&self) -> f32 {
        self.vel.length()
    }

    /// Advance one tick of motion, reflecting velocity off the arena walls.
    ///
    /// Only the velocity is reflected. The position is left where it landed,
    /// so an agent can sit up to one tick's displacement outside the arena.
    pub fn integrate_motion(&mut self, width: f32, height: f32) {
        self.pos += self.vel;

        if self.pos.x < 0.0 || self.pos.x > width {
            self.vel.x = -self.vel.x;
        }
        if self.pos.y < 0.0 || self.pos.y > height {
            self.vel.y = -self.vel.y;
        }
    }

    /// Steer away from crowding neighbors.
    ///
    /// `snapshots` holds every agent as of tick start, including this one at
    /// `index`. Each neighbor closer than `min_separation` contributes a unit
    /// vector pointing away from it; the sum is normalized and applied as a
    /// fixed nudge. Coincident agents contribute nothing.
    pub fn compute_avoidance(
        &mut self,
        index: usize,
        snapshots: &[AgentSnapshot],
        config: &SimConfig,
    ) {
        let me = snapshots[index].pos;
        let mut push = Vec2::ZERO;

        for (j, other) in snapshots.iter().enumerate() {
            if j == index {
                continue;
            }
            let away = me - other.pos;
            let dist = away.length();
            if dist > 0.0 && dist < config.min_separation {
                push += away / dist;
            }
        }

        if let Some(dir) = push.try_normalize() {
            self.vel += dir * config.avoidance_nudge;
        }
        self.vel = self.vel.clamp_length_max(config.max_speed);
    }

    /// Age this agent's infection by one tick and recover it once the
    /// duration has been exceeded.
    pub fn advance_infection(&mut self, duration: u32) -> InfectionProgress {
        if self.health != HealthState::Infected {
            return InfectionProgress::Unaffected;
        }

        self.infection_age += 1;
        if self.infection_age > duration {
            self.set_health(HealthState::Immune);
            return InfectionProgress::Recovered;
        }
        InfectionProgress::Contagious
    }

    /// Advance this agent's infection, then roll one transmission trial for
    /// every healthy neighbor in range.
    ///
    /// Successful targets are pushed to `exposed` as snapshot indices; the
    /// caller promotes them once every source has run.
    pub fn advance_infection_and_transmit(
        &mut self,
        index: usize,
        snapshots: &[AgentSnapshot],
        config: &SimConfig,
        rng: &mut fastrand::Rng,
        exposed: &mut Vec<usize>,
    ) -> InfectionProgress {
        let progress = self.advance_infection(config.infection_duration);
        if progress != InfectionProgress::Contagious {
            return progress;
        }

        let me = snapshots[index].pos;
        let radius_sq = config.infection_radius * config.infection_radius;
        for (j, other) in snapshots.iter().enumerate() {
            if j == index || other.health != HealthState::Healthy {
                continue;
            }
            if me.distance_squared(other.pos) < radius_sq && rng.f32() < config.infection_chance {
                exposed.push(j);
            }
        }
        progress
    }

    /// Healthy -> Infected. Returns false (and changes nothing) for any
    /// other state.
    pub fn infect(&mut self) -> bool {
        if self.health != HealthState::Healthy {
            return false;
        }
        self.set_health(HealthState::Infected);
        true
    }

    /// Move to `next` and restart the infection clock.
    fn set_health(&mut self, next: HealthState) {
        debug_assert!(
            self.health.may_become(next),
            "{:?} -> {next:?}",
            self.health
        );
        self.health = next;
        self.infection_age = 0;
    }
}

/// Spawn the starting population: one infected agent followed by healthy
/// ones, scattered uniformly with random headings at full speed.
pub fn spawn_population(config: &SimConfig, rng: &mut fastrand::Rng) -> Vec<Agent> {
    (0..config.population)
        .map(|i| {
            let pos = Vec2::new(rng.f32() * config.width, rng.f32() * config.height);
            let heading = rng.f32() * std::f32::consts::TAU;
            let vel = Vec2::from_angle(heading) * config.max_speed;
            let health = if i == 0 {
                HealthState::Infected
            } else {
                HealthState::Healthy
            };
            Agent::new(pos, vel, health)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn still(x: f32, y: f32, health: HealthState) -> Agent {
        Agent::new(Vec2::new(x, y), Vec2::ZERO, health)
    }

    fn snapshots(agents: &[Agent]) -> Vec<AgentSnapshot> {
        agents.iter().map(Agent::snapshot).collect()
    }

    #[test]
    fn reflects_velocity_without_clamping() {
        let mut a = Agent::new(Vec2::new(799.5, 400.0), Vec2::new(2.0, 0.0), HealthState::Healthy);
        a.integrate_motion(800.0, 800.0);
        assert_eq!(a.vel.x, -2.0);
        assert_eq!(a.pos.x, 801.5);

        // next tick carries it back inside without flipping again
        a.integrate_motion(800.0, 800.0);
        assert_eq!(a.pos.x, 799.5);
        assert_eq!(a.vel.x, -2.0);
    }

    #[test]
    fn reflects_each_axis_independently() {
        let mut a = Agent::new(Vec2::new(1.0, 400.0), Vec2::new(-1.5, 1.0), HealthState::Healthy);
        a.integrate_motion(800.0, 800.0);
        assert_eq!(a.vel, Vec2::new(1.5, 1.0));
        assert_relative_eq!(a.pos.x, -0.5);
    }

    #[test]
    fn avoidance_pushes_away_at_fixed_nudge() {
        let cfg = SimConfig::default();
        let mut agents = [
            still(100.0, 100.0, HealthState::Healthy),
            still(110.0, 100.0, HealthState::Healthy),
        ];
        let snaps = snapshots(&agents);
        agents[0].compute_avoidance(0, &snaps, &cfg);
        assert_relative_eq!(agents[0].vel.x, -cfg.avoidance_nudge);
        assert_relative_eq!(agents[0].vel.y, 0.0);
    }

    #[test]
    fn avoidance_ignores_distant_agents() {
        let cfg = SimConfig::default();
        let mut agents = [
            still(100.0, 100.0, HealthState::Healthy),
            still(100.0, 120.0, HealthState::Healthy),
        ];
        let snaps = snapshots(&agents);
        agents[0].compute_avoidance(0, &snaps, &cfg);
        assert_eq!(agents[0].vel, Vec2::ZERO, "exactly min_separation apart is not crowding");
    }

    #[test]
    fn avoidance_sums_unit_vectors_before_normalizing() {
        let cfg = SimConfig::default();
        // one neighbor very close to the left, one further away below:
        // the sum is unweighted by distance, so the push is diagonal
        let mut agents = [
            still(100.0, 100.0, HealthState::Healthy),
            still(99.0, 100.0, HealthState::Healthy),
            still(100.0, 115.0, HealthState::Healthy),
        ];
        let snaps = snapshots(&agents);
        agents[0].compute_avoidance(0, &snaps, &cfg);
        let expected = Vec2::new(1.0, -1.0).normalize() * cfg.avoidance_nudge;
        assert_relative_eq!(agents[0].vel.x, expected.x, epsilon = 1e-6);
        assert_relative_eq!(agents[0].vel.y, expected.y, epsilon = 1e-6);
    }

    #[test]
    fn coincident_agents_do_not_repel() {
        let cfg = SimConfig::default();
        let mut agents = [
            still(50.0, 50.0, HealthState::Healthy),
            still(50.0, 50.0, HealthState::Healthy),
        ];
        let snaps = snapshots(&agents);
        for i in 0..agents.len() {
            agents[i].compute_avoidance(i, &snaps, &cfg);
            assert_eq!(agents[i].vel, Vec2::ZERO);
            assert!(agents[i].vel.is_finite());
        }
    }

    #[test]
    fn avoidance_caps_speed() {
        let cfg = SimConfig::default();
        let mut agents = [
            Agent::new(
                Vec2::new(100.0, 100.0),
                Vec2::new(cfg.max_speed, 0.0),
                HealthState::Healthy,
            ),
            still(95.0, 100.0, HealthState::Healthy),
        ];
        let snaps = snapshots(&agents);
        agents[0].compute_avoidance(0, &snaps, &cfg);
        assert_relative_eq!(agents[0].speed(), cfg.max_speed, epsilon = 1e-5);
        assert!(agents[0].vel.x > 0.0, "direction preserved");
    }

    #[test]
    fn recovery_happens_after_duration_is_exceeded() {
        let duration = 200;
        for (start_age, expected) in [
            (duration - 1, HealthState::Infected),
            (duration, HealthState::Immune),
            (duration + 1, HealthState::Immune),
        ] {
            let mut a = still(0.0, 0.0, HealthState::Infected);
            a.infection_age = start_age;
            a.advance_infection(duration);
            assert_eq!(a.health, expected, "starting at age {start_age}");
        }

        // reaching exactly `duration` keeps the agent infected for one more tick
        let mut a = still(0.0, 0.0, HealthState::Infected);
        a.infection_age = duration - 1;
        assert_eq!(a.advance_infection(duration), InfectionProgress::Contagious);
        assert_eq!(a.infection_age, duration);
        assert_eq!(a.advance_infection(duration), InfectionProgress::Recovered);
        assert_eq!(a.health, HealthState::Immune);
        assert_eq!(a.infection_age, 0);
    }

    #[test]
    fn advance_ignores_non_infected() {
        for health in [HealthState::Healthy, HealthState::Immune] {
            let mut a = still(0.0, 0.0, health);
            assert_eq!(a.advance_infection(10), InfectionProgress::Unaffected);
            assert_eq!(a.infection_age, 0);
            assert_eq!(a.health, health);
        }
    }

    #[test]
    fn transmits_to_healthy_neighbors_in_range() {
        let cfg = SimConfig {
            infection_chance: 1.0,
            ..SimConfig::default()
        };
        let mut rng = fastrand::Rng::with_seed(1);
        let mut agents = [
            still(0.0, 0.0, HealthState::Infected),
            still(5.0, 0.0, HealthState::Healthy),
            still(0.0, 29.0, HealthState::Healthy),
            still(30.0, 0.0, HealthState::Healthy),
            still(3.0, 3.0, HealthState::Immune),
            still(3.0, 0.0, HealthState::Infected),
        ];
        let snaps = snapshots(&agents);
        let mut exposed = Vec::new();
        let progress = agents[0].advance_infection_and_transmit(
            0,
            &snaps,
            &cfg,
            &mut rng,
            &mut exposed,
        );
        assert_eq!(progress, InfectionProgress::Contagious);
        assert_eq!(exposed, vec![1, 2]);
        assert_eq!(agents[0].infection_age, 1);
    }

    #[test]
    fn zero_chance_never_transmits() {
        let cfg = SimConfig {
            infection_chance: 0.0,
            ..SimConfig::default()
        };
        let mut rng = fastrand::Rng::with_seed(3);
        let mut agents = [
            still(0.0, 0.0, HealthState::Infected),
            still(1.0, 0.0, HealthState::Healthy),
        ];
        let snaps = snapshots(&agents);
        let mut exposed = Vec::new();
        for _ in 0..100 {
            agents[0].advance_infection_and_transmit(0, &snaps, &cfg, &mut rng, &mut exposed);
        }
        assert!(exposed.is_empty());
    }

    #[test]
    fn recovering_agent_does_not_transmit() {
        let cfg = SimConfig {
            infection_chance: 1.0,
            infection_duration: 5,
            ..SimConfig::default()
        };
        let mut rng = fastrand::Rng::with_seed(9);
        let mut agents = [
            still(0.0, 0.0, HealthState::Infected),
            still(1.0, 0.0, HealthState::Healthy),
        ];
        agents[0].infection_age = 5;
        let snaps = snapshots(&agents);
        let mut exposed = Vec::new();
        let progress = agents[0].advance_infection_and_transmit(
            0,
            &snaps,
            &cfg,
            &mut rng,
            &mut exposed,
        );
        assert_eq!(progress, InfectionProgress::Recovered);
        assert!(exposed.is_empty());
    }

    #[test]
    fn infect_only_promotes_healthy() {
        let mut a = still(0.0, 0.0, HealthState::Healthy);
        assert!(a.infect());
        assert_eq!(a.health, HealthState::Infected);
        assert_eq!(a.infection_age, 0);

        a.infection_age = 12;
        assert!(!a.infect(), "already infected");
        assert_eq!(a.infection_age, 12);

        let mut b = still(0.0, 0.0, HealthState::Immune);
        assert!(!b.infect());
        assert_eq!(b.health, HealthState::Immune);
    }

    #[test]
    fn spawn_starts_with_one_infected_at_full_speed() {
        let cfg = SimConfig::default();
        let mut rng = fastrand::Rng::with_seed(42);
        let agents = spawn_population(&cfg, &mut rng);

        assert_eq!(agents.len(), cfg.population);
        let counts = HealthCounts::tally(agents.iter().map(|a| &a.health));
        assert_eq!(counts.infected, 1);
        assert_eq!(counts.immune, 0);
        assert_eq!(agents[0].health, HealthState::Infected);

        for a in &agents {
            assert!((0.0..=cfg.width).contains(&a.pos.x));
            assert!((0.0..=cfg.height).contains(&a.pos.y));
            assert_relative_eq!(a.speed(), cfg.max_speed, epsilon = 1e-5);
            assert_eq!(a.infection_age, 0);
        }
    }
}
