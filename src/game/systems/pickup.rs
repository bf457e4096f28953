//! Pickup spawning and collection
//!
//! Spawning is a Bernoulli trial on every physics tick rather than a fixed
//! cadence, so arrivals look Poisson-like to the agents.

use rand::Rng;

use crate::config::PickupConfig;
use crate::game::state::{Agent, Pickup, PickupId, World};

/// Spawn one pickup if the arena is below its cap. The pickup lands uniformly
/// inside `[radius, dimension - radius]` on both axes.
pub fn try_spawn<R: Rng + ?Sized>(
    world: &mut World,
    config: &PickupConfig,
    radius: f32,
    rng: &mut R,
) -> Option<PickupId> {
    if world.pickups.len() >= config.max_count {
        return None;
    }
    let position = world.bounds.random_inside(radius, rng);
    Some(world.add_pickup(position))
}

/// Per-tick spawn: a Bernoulli trial with `spawn_chance`, then `try_spawn`.
pub fn maybe_spawn<R: Rng + ?Sized>(
    world: &mut World,
    config: &PickupConfig,
    radius: f32,
    rng: &mut R,
) -> Option<PickupId> {
    if rng.gen_bool(config.spawn_chance) {
        try_spawn(world, config, radius, rng)
    } else {
        None
    }
}

/// Remove every pickup within `reach` of the agent, scoring one point each.
pub fn collect(agent: &mut Agent, pickups: &mut Vec<Pickup>, reach: f32) -> u32 {
    let before = pickups.len();
    pickups.retain(|pickup| agent.position.distance_to(pickup.position) >= reach);
    let collected = (before - pickups.len()) as u32;
    agent.score += collected;
    collected
}

/// Run collection for the whole roster, in roster order. Returns pickups collected.
pub fn update(world: &mut World, config: &PickupConfig, radius: f32) -> u32 {
    let reach = radius + config.collection_margin;
    let (agents, pickups) = world.agents_and_pickups_mut();

    let mut collected = 0;
    for agent in agents.iter_mut() {
        collected += collect(agent, pickups, reach);
    }
    collected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RosterEntry;
    use crate::game::state::Bounds;
    use crate::util::vec2::Vec2;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn world_with_agent(position: Vec2) -> World {
        let mut world = World::new(Bounds::new(400.0, 300.0));
        world.add_agent(Agent::new(&RosterEntry::new("a", "A", "red", "m"), position));
        world
    }

    #[test]
    fn test_spawn_respects_cap() {
        let mut rng = StdRng::seed_from_u64(3);
        let config = PickupConfig::default();
        let mut world = world_with_agent(Vec2::new(200.0, 150.0));

        assert!(try_spawn(&mut world, &config, 15.0, &mut rng).is_some());
        assert!(try_spawn(&mut world, &config, 15.0, &mut rng).is_some());

        for _ in 0..1000 {
            assert!(try_spawn(&mut world, &config, 15.0, &mut rng).is_none());
            assert_eq!(world.pickups.len(), 2);
        }
    }

    #[test]
    fn test_spawn_inside_margins() {
        let mut rng = StdRng::seed_from_u64(11);
        let config = PickupConfig {
            max_count: 1000,
            ..PickupConfig::default()
        };
        let mut world = world_with_agent(Vec2::new(200.0, 150.0));

        for _ in 0..1000 {
            try_spawn(&mut world, &config, 15.0, &mut rng);
        }

        assert_eq!(world.pickups.len(), 1000);
        for pickup in &world.pickups {
            assert!(world.bounds.contains(pickup.position, 15.0));
        }
    }

    #[test]
    fn test_maybe_spawn_is_stochastic() {
        let mut rng = StdRng::seed_from_u64(5);
        let config = PickupConfig::default();
        let mut spawned = 0;

        for _ in 0..1000 {
            let mut world = world_with_agent(Vec2::new(200.0, 150.0));
            if maybe_spawn(&mut world, &config, 15.0, &mut rng).is_some() {
                spawned += 1;
            }
        }

        // Bernoulli(0.9) over 1000 trials
        assert!(spawned > 850 && spawned < 950, "spawned {}", spawned);
    }

    #[test]
    fn test_maybe_spawn_never_with_zero_chance() {
        let mut rng = StdRng::seed_from_u64(5);
        let config = PickupConfig {
            spawn_chance: 0.0,
            ..PickupConfig::default()
        };
        let mut world = world_with_agent(Vec2::new(200.0, 150.0));

        for _ in 0..100 {
            assert!(maybe_spawn(&mut world, &config, 15.0, &mut rng).is_none());
        }
    }

    #[test]
    fn test_collect_within_reach() {
        let mut world = world_with_agent(Vec2::new(100.0, 100.0));
        world.add_pickup(Vec2::new(120.0, 100.0));
        world.add_pickup(Vec2::new(300.0, 200.0));

        let collected = update(&mut world, &PickupConfig::default(), 15.0);

        assert_eq!(collected, 1);
        assert_eq!(world.pickups.len(), 1);
        assert_eq!(world.agents()[0].score, 1);
    }

    #[test]
    fn test_collect_two_at_once() {
        let mut world = world_with_agent(Vec2::new(100.0, 100.0));
        world.add_pickup(Vec2::new(110.0, 100.0));
        world.add_pickup(Vec2::new(100.0, 90.0));

        let collected = update(&mut world, &PickupConfig::default(), 15.0);

        assert_eq!(collected, 2);
        assert!(world.pickups.is_empty());
        assert_eq!(world.agents()[0].score, 2);
    }

    #[test]
    fn test_reach_boundary_is_exclusive() {
        // Reach is radius + margin = 25; a pickup at exactly 25 stays
        let mut world = world_with_agent(Vec2::new(100.0, 100.0));
        world.add_pickup(Vec2::new(125.0, 100.0));

        assert_eq!(update(&mut world, &PickupConfig::default(), 15.0), 0);
        assert_eq!(world.pickups.len(), 1);
    }

    #[test]
    fn test_first_agent_in_roster_wins_shared_pickup() {
        let mut world = world_with_agent(Vec2::new(100.0, 100.0));
        world.add_agent(Agent::new(&RosterEntry::new("b", "B", "blue", "m"), Vec2::new(130.0, 100.0)));
        world.add_pickup(Vec2::new(115.0, 100.0));

        update(&mut world, &PickupConfig::default(), 15.0);

        assert_eq!(world.get_agent("a").unwrap().score, 1);
        assert_eq!(world.get_agent("b").unwrap().score, 0);
    }
}
