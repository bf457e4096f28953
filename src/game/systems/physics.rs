use rayon::prelude::*;

use crate::config::PhysicsConfig;
use crate::game::state::{Agent, Bounds, World};

/// Advance every agent by one tick. Returns how many agents touched a wall.
/// Agents are independent here, so the update runs in parallel.
pub fn update(world: &mut World, config: &PhysicsConfig) -> usize {
    let bounds = world.bounds;

    world
        .agents_mut()
        .par_iter_mut()
        .map(|agent| apply_motion(agent, config, bounds))
        .filter(|&hit_wall| hit_wall)
        .count()
}

/// Integrate one tick of motion for a single agent:
/// heading acceleration, multiplicative friction, speed cap, position step,
/// then wall bounce. Returns whether a wall was hit.
pub fn apply_motion(agent: &mut Agent, config: &PhysicsConfig, bounds: Bounds) -> bool {
    agent.velocity += agent.heading * config.acceleration;
    agent.velocity *= config.friction;
    agent.velocity = agent.velocity.clamp_length(config.max_speed);

    agent.position += agent.velocity;

    resolve_wall_collision(agent, config.radius, config.bounce_factor, bounds)
}

/// Clamp the agent inside `[radius, bound - radius]` on both axes. On contact
/// the velocity component is forced to point away from the wall and scaled by
/// `bounce`.
pub fn resolve_wall_collision(agent: &mut Agent, radius: f32, bounce: f32, bounds: Bounds) -> bool {
    let mut collided = false;

    if agent.position.x - radius < 0.0 {
        agent.position.x = radius;
        agent.velocity.x = agent.velocity.x.abs() * bounce;
        collided = true;
    } else if agent.position.x + radius > bounds.width {
        agent.position.x = bounds.width - radius;
        agent.velocity.x = -agent.velocity.x.abs() * bounce;
        collided = true;
    }

    if agent.position.y - radius < 0.0 {
        agent.position.y = radius;
        agent.velocity.y = agent.velocity.y.abs() * bounce;
        collided = true;
    } else if agent.position.y + radius > bounds.height {
        agent.position.y = bounds.height - radius;
        agent.velocity.y = -agent.velocity.y.abs() * bounce;
        collided = true;
    }

    collided
}

/// Position-only clamp used after collision separation; velocities are left alone.
pub fn clamp_to_bounds(agent: &mut Agent, radius: f32, bounds: Bounds) {
    agent.position.x = agent.position.x.clamp(radius, bounds.width - radius);
    agent.position.y = agent.position.y.clamp(radius, bounds.height - radius);
}
