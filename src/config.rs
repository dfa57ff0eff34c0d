/// Static simulation parameters, built once by the shell and trusted by the core.
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    /// Arena width in pixels.
    pub width: f32,
    /// Arena height in pixels.
    pub height: f32,
    /// Number of agents, fixed for the whole run.
    pub population: usize,
    /// Drawn disc radius. Rendering only.
    pub agent_radius: f32,
    /// Hard cap on velocity magnitude (pixels/tick).
    pub max_speed: f32,
    /// Agents closer than this push each other apart.
    pub min_separation: f32,
    /// Velocity added along the repulsion direction per tick.
    pub avoidance_nudge: f32,
    /// Contact range for transmission.
    pub infection_radius: f32,
    /// Bernoulli probability per (infected, healthy) contact per tick.
    pub infection_chance: f32,
    /// Ticks an agent stays infected before turning immune.
    pub infection_duration: u32,
    /// Fixed RNG seed. `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 800.0,
            population: 50,
            agent_radius: 4.0,
            max_speed: 2.0,
            min_separation: 20.0,
            avoidance_nudge: 0.5,
            infection_radius: 30.0,
            infection_chance: 0.2,
            infection_duration: 200,
            seed: None,
        }
    }
}

/// Rejected configuration values.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("arena must have positive size, got {width}x{height}")]
    InvalidArena { width: f32, height: f32 },
    #[error("population must contain at least one agent")]
    EmptyPopulation,
    #[error("{field} must be a finite value > 0, got {value}")]
    NotPositive { field: &'static str, value: f32 },
    #[error("{field} must be a finite value >= 0, got {value}")]
    Negative { field: &'static str, value: f32 },
    #[error("infection chance must lie in [0, 1], got {0}")]
    ChanceOutOfRange(f32),
}

impl SimConfig {
    /// Check every value the tick loop relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.width.is_finite() && self.height.is_finite())
            || self.width <= 0.0
            || self.height <= 0.0
        {
            return Err(ConfigError::InvalidArena {
                width: self.width,
                height: self.height,
            });
        }
        if self.population == 0 {
            return Err(ConfigError::EmptyPopulation);
        }

        positive("max_speed", self.max_speed)?;
        positive("agent_radius", self.agent_radius)?;
        non_negative("min_separation", self.min_separation)?;
        non_negative("avoidance_nudge", self.avoidance_nudge)?;
        non_negative("infection_radius", self.infection_radius)?;

        if !(0.0..=1.0).contains(&self.infection_chance) {
            return Err(ConfigError::ChanceOutOfRange(self.infection_chance));
        }
        Ok(())
    }

    /// RNG for spawning and transmission trials.
    pub fn rng(&self) -> fastrand::Rng {
        match self.seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        }
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field, value })
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Negative { field, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert_eq!(SimConfig::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_bad_arena() {
        let cfg = SimConfig {
            width: 0.0,
            ..SimConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidArena { .. })));

        let cfg = SimConfig {
            height: f32::NAN,
            ..SimConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidArena { .. })));
    }

    #[test]
    fn rejects_empty_population() {
        let cfg = SimConfig {
            population: 0,
            ..SimConfig::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::EmptyPopulation));
    }

    #[test]
    fn rejects_negative_radius() {
        let cfg = SimConfig {
            infection_radius: -1.0,
            ..SimConfig::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::Negative {
                field: "infection_radius",
                value: -1.0
            })
        );
    }

    #[test]
    fn rejects_zero_speed() {
        let cfg = SimConfig {
            max_speed: 0.0,
            ..SimConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::NotPositive { field: "max_speed", .. })
        ));
    }

    #[test]
    fn chance_bounds() {
        for chance in [0.0, 0.5, 1.0] {
            let cfg = SimConfig {
                infection_chance: chance,
                ..SimConfig::default()
            };
            assert!(cfg.validate().is_ok());
        }
        for chance in [-0.1, 1.01, f32::NAN] {
            let cfg = SimConfig {
                infection_chance: chance,
                ..SimConfig::default()
            };
            assert!(matches!(cfg.validate(), Err(ConfigError::ChanceOutOfRange(_))));
        }
    }

    #[test]
    fn seeded_rng_is_reproducible() {
        let cfg = SimConfig {
            seed: Some(7),
            ..SimConfig::default()
        };
        let mut a = cfg.rng();
        let mut b = cfg.rng();
        for _ in 0..8 {
            assert_eq!(a.u32(..), b.u32(..));
        }
    }
}
