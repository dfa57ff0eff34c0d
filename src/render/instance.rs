use bytemuck::{Pod, Zeroable};

use crate::agent::{Agent, HealthState};

/// Fill colors, RGBA packed as u32.
const HEALTHY_COLOR: u32 = 0x0000_FFFF;
const INFECTED_COLOR: u32 = 0xFF00_00FF;
const IMMUNE_COLOR: u32 = 0x00FF_00FF;

/// Shape selector read by the fragment shader.
pub const SHAPE_DISC: u32 = 0;
pub const SHAPE_RING: u32 = 1;

/// Body disc plus the infection ring.
const MAX_SHAPES_PER_AGENT: usize = 2;

/// Instances needed to draw `population` agents in the worst case.
pub fn capacity_for(population: usize) -> usize {
    population * MAX_SHAPES_PER_AGENT
}

/// Per-instance data uploaded to GPU each frame.
/// Stride = 20 bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct AgentInstance {
    /// Arena position (x, y).
    pub position: [f32; 2],
    /// Outer radius in arena pixels.
    pub radius: f32,
    /// RGBA color packed as u32.
    pub color: u32,
    /// `SHAPE_DISC` or `SHAPE_RING`.
    pub shape: u32,
}

pub fn health_color(health: HealthState) -> u32 {
    match health {
        HealthState::Healthy => HEALTHY_COLOR,
        HealthState::Infected => INFECTED_COLOR,
        HealthState::Immune => IMMUNE_COLOR,
    }
}

/// Append the instances for one agent: its body, plus the contact ring
/// while infected.
pub fn push_agent(
    out: &mut Vec<AgentInstance>,
    agent: &Agent,
    agent_radius: f32,
    infection_radius: f32,
) {
    let position = agent.pos.into();
    out.push(AgentInstance {
        position,
        radius: agent_radius,
        color: health_color(agent.health),
        shape: SHAPE_DISC,
    });
    if agent.health == HealthState::Infected {
        out.push(AgentInstance {
            position,
            radius: infection_radius,
            color: INFECTED_COLOR,
            shape: SHAPE_RING,
        });
    }
}
