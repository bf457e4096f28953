//! One physics tick over the world
//!
//! Order per tick: motion and wall bounce for every agent, pickup collection,
//! one collision pass for the whole roster, then the stochastic spawn.

use rand::Rng;

use crate::config::{PhysicsConfig, PickupConfig, SimConfig};
use crate::game::state::{AgentId, PickupId, World};
use crate::game::systems::{collision, physics, pickup};
use crate::util::vec2::Vec2;

/// What happened during one tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub tick: u64,
    pub wall_contacts: usize,
    pub agent_contacts: usize,
    pub collected: u32,
    pub spawned: Option<PickupId>,
}

#[derive(Debug, Clone)]
pub struct GameLoop {
    physics: PhysicsConfig,
    pickups: PickupConfig,
}

impl GameLoop {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            physics: config.physics.clone(),
            pickups: config.pickups.clone(),
        }
    }

    pub fn physics(&self) -> &PhysicsConfig {
        &self.physics
    }

    /// Seed the arena with a pickup so the first decisions have a target
    pub fn prime<R: Rng + ?Sized>(&self, world: &mut World, rng: &mut R) -> Option<PickupId> {
        pickup::try_spawn(world, &self.pickups, self.physics.radius, rng)
    }

    /// Advance the world by one tick
    pub fn tick<R: Rng + ?Sized>(&self, world: &mut World, rng: &mut R) -> TickReport {
        let wall_contacts = physics::update(world, &self.physics);
        let collected = pickup::update(world, &self.pickups, self.physics.radius);
        let agent_contacts = collision::update(world, &self.physics);
        let spawned = pickup::maybe_spawn(world, &self.pickups, self.physics.radius, rng);

        world.tick += 1;

        TickReport {
            tick: world.tick,
            wall_contacts,
            agent_contacts,
            collected,
            spawned,
        }
    }
}

/// Reset any agent whose position or velocity went non-finite. Returns the ids
/// that were repaired.
pub fn sanitize(world: &mut World) -> Vec<AgentId> {
    let center = world.bounds.center();
    let mut repaired = Vec::new();

    for agent in world.agents_mut() {
        let mut fixed = false;
        if !agent.position.is_finite() {
            agent.position = center;
            fixed = true;
        }
        if !agent.velocity.is_finite() {
            agent.velocity = Vec2::ZERO;
            fixed = true;
        }
        if !agent.heading.is_finite() {
            agent.heading = Vec2::ZERO;
            fixed = true;
        }
        if fixed {
            repaired.push(agent.id.clone());
        }
    }

    repaired
}
