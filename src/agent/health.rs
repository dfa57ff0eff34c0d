/// Infection state. Only ever moves forward: Healthy -> Infected -> Immune.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u8)]
pub enum HealthState {
    #[default]
    Healthy,
    Infected,
    Immune,
}

impl HealthState {
    pub const ALL: [HealthState; 3] = [Self::Healthy, Self::Infected, Self::Immune];

    pub fn label(self) -> &'static str {
        match self {
            Self::Healthy => "Healthy",
            Self::Infected => "Infected",
            Self::Immune => "Immune",
        }
    }

    /// True if `next` is this state or the one directly after it.
    pub fn may_become(self, next: HealthState) -> bool {
        matches!(
            (self, next),
            (Self::Healthy, Self::Healthy | Self::Infected)
                | (Self::Infected, Self::Infected | Self::Immune)
                | (Self::Immune, Self::Immune)
        )
    }
}

/// Per-state census of the population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HealthCounts {
    pub healthy: usize,
    pub infected: usize,
    pub immune: usize,
}

impl HealthCounts {
    pub fn tally<'a>(states: impl IntoIterator<Item = &'a HealthState>) -> Self {
        let mut counts = Self::default();
        for state in states {
            match state {
                HealthState::Healthy => counts.healthy += 1,
                HealthState::Infected => counts.infected += 1,
                HealthState::Immune => counts.immune += 1,
            }
        }
        counts
    }

    pub fn get(&self, state: HealthState) -> usize {
        match state {
            HealthState::Healthy => self.healthy,
            HealthState::Infected => self.infected,
            HealthState::Immune => self.immune,
        }
    }

    pub fn total(&self) -> usize {
        self.healthy + self.infected + self.immune
    }
}
