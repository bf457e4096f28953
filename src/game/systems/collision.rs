//! Agent-agent collision resolution
//!
//! Equal-mass elastic impulses along the contact normal, followed by positional
//! separation. Every contact response is computed from the state at the start
//! of the call and the per-agent sums are applied together, so roster order
//! does not change the outcome. Relaxation passes afterwards keep agents apart
//! and inside the walls even when several of them pile up in a corner.

use crate::config::PhysicsConfig;
use crate::game::constants::collision::{COINCIDENT_EPSILON, SEPARATION_PASSES};
use crate::game::state::{Agent, Bounds, World};
use crate::game::systems::physics::clamp_to_bounds;
use crate::util::vec2::Vec2;

/// Overlap below this is considered resolved
const OVERLAP_TOLERANCE: f32 = 1e-4;

/// Resolve collisions for the whole roster once. Returns the contact count.
pub fn update(world: &mut World, config: &PhysicsConfig) -> usize {
    let bounds = world.bounds;
    resolve_agent_collisions(world.agents_mut(), config, bounds)
}

/// Every unordered pair gets at most one impulse per call.
pub fn resolve_agent_collisions(agents: &mut [Agent], config: &PhysicsConfig, bounds: Bounds) -> usize {
    let diameter = config.radius * 2.0;
    let mut contacts = 0;

    let snapshot: Vec<(Vec2, Vec2)> = agents.iter().map(|a| (a.position, a.velocity)).collect();
    let mut deltas = vec![(Vec2::ZERO, Vec2::ZERO); agents.len()];

    for i in 0..snapshot.len() {
        for j in (i + 1)..snapshot.len() {
            let Some(response) = contact_response(snapshot[i], snapshot[j], config.bounce_factor, diameter) else {
                continue;
            };
            contacts += 1;
            deltas[i].0 -= response.velocity;
            deltas[i].1 -= response.position;
            deltas[j].0 += response.velocity;
            deltas[j].1 += response.position;
        }
    }

    for (agent, (dv, dp)) in agents.iter_mut().zip(deltas) {
        agent.velocity += dv;
        agent.position += dp;
    }

    for _ in 0..SEPARATION_PASSES {
        for agent in agents.iter_mut() {
            clamp_to_bounds(agent, config.radius, bounds);
        }

        let mut overlapping = false;
        for_each_pair(agents, |a, b| {
            overlapping |= separate_pair(a, b, diameter);
        });

        if !overlapping {
            break;
        }
    }

    for agent in agents.iter_mut() {
        clamp_to_bounds(agent, config.radius, bounds);
    }

    contacts
}

fn for_each_pair(agents: &mut [Agent], mut f: impl FnMut(&mut Agent, &mut Agent)) {
    let n = agents.len();
    for i in 0..n {
        for j in (i + 1)..n {
            let (left, right) = agents.split_at_mut(j);
            f(&mut left[i], &mut right[0]);
        }
    }
}

/// Unit normal from `a` to `b` and the centre distance. Coincident centres get
/// a fixed `+x` normal so they are pushed apart deterministically.
fn contact_normal(a: Vec2, b: Vec2) -> (Vec2, f32) {
    let (normal, distance) = (b - a).normalize_with_length();
    if distance < COINCIDENT_EPSILON {
        (Vec2::RIGHT, distance)
    } else {
        (normal, distance)
    }
}

/// Change applied to the second agent of a contact; the first gets the negation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactResponse {
    pub velocity: Vec2,
    pub position: Vec2,
}

/// Impulse plus half-overlap separation for one `(position, velocity)` pair.
/// `None` when the two are not in contact.
pub fn contact_response(
    (a_pos, a_vel): (Vec2, Vec2),
    (b_pos, b_vel): (Vec2, Vec2),
    restitution: f32,
    diameter: f32,
) -> Option<ContactResponse> {
    let (normal, distance) = contact_normal(a_pos, b_pos);
    if distance >= diameter {
        return None;
    }

    // Only approaching pairs exchange momentum
    let normal_velocity = (b_vel - a_vel).dot(normal);
    let velocity = if normal_velocity < 0.0 {
        normal * (-(1.0 + restitution) * normal_velocity / 2.0)
    } else {
        Vec2::ZERO
    };

    Some(ContactResponse {
        velocity,
        position: normal * ((diameter - distance) / 2.0),
    })
}

/// Positional separation only. Returns whether the pair still overlapped.
fn separate_pair(a: &mut Agent, b: &mut Agent, diameter: f32) -> bool {
    let (normal, distance) = contact_normal(a.position, b.position);
    let overlap = diameter - distance;
    if overlap <= OVERLAP_TOLERANCE {
        return false;
    }
    push_apart(a, b, normal, overlap);
    true
}

fn push_apart(a: &mut Agent, b: &mut Agent, normal: Vec2, overlap: f32) {
    let half = overlap / 2.0;
    a.position -= normal * half;
    b.position += normal * half;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RosterEntry;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn agent(id: &str, position: Vec2, velocity: Vec2) -> Agent {
        let mut agent = Agent::new(&RosterEntry::new(id, id, "red", "m"), position);
        agent.velocity = velocity;
        agent
    }

    fn bounds() -> Bounds {
        Bounds::new(400.0, 300.0)
    }

    fn config(bounce: f32) -> PhysicsConfig {
        PhysicsConfig {
            bounce_factor: bounce,
            ..PhysicsConfig::default()
        }
    }

    #[test]
    fn test_head_on_elastic() {
        let cfg = config(1.0);
        let r = cfg.radius;
        let mut agents = vec![
            agent("a", Vec2::new(100.0, 150.0), Vec2::new(0.3, 0.0)),
            agent("b", Vec2::new(100.0 + r, 150.0), Vec2::new(-0.3, 0.0)),
        ];

        let contacts = resolve_agent_collisions(&mut agents, &cfg, bounds());

        assert_eq!(contacts, 1);
        let distance = agents[0].position.distance_to(agents[1].position);
        assert!((distance - 2.0 * r).abs() < 1e-3);
        assert!(agents[0].velocity.approx_eq(Vec2::new(-0.3, 0.0), 1e-6));
        assert!(agents[1].velocity.approx_eq(Vec2::new(0.3, 0.0), 1e-6));
    }

    #[test]
    fn test_head_on_with_restitution() {
        let cfg = config(0.8);
        let r = cfg.radius;
        let mut agents = vec![
            agent("a", Vec2::new(100.0, 150.0), Vec2::new(0.3, 0.0)),
            agent("b", Vec2::new(100.0 + r, 150.0), Vec2::new(-0.3, 0.0)),
        ];

        resolve_agent_collisions(&mut agents, &cfg, bounds());

        // Relative speed 0.6 comes back as 0.6 * 0.8
        assert!(agents[0].velocity.approx_eq(Vec2::new(-0.24, 0.0), 1e-6));
        assert!(agents[1].velocity.approx_eq(Vec2::new(0.24, 0.0), 1e-6));
    }

    #[test]
    fn test_separating_pair_keeps_velocity() {
        let cfg = config(1.0);
        let mut agents = vec![
            agent("a", Vec2::new(100.0, 150.0), Vec2::new(-0.2, 0.0)),
            agent("b", Vec2::new(110.0, 150.0), Vec2::new(0.2, 0.0)),
        ];

        resolve_agent_collisions(&mut agents, &cfg, bounds());

        assert_eq!(agents[0].velocity, Vec2::new(-0.2, 0.0));
        assert_eq!(agents[1].velocity, Vec2::new(0.2, 0.0));
        // Still pushed out of overlap
        let distance = agents[0].position.distance_to(agents[1].position);
        assert!(distance >= 2.0 * cfg.radius - 1e-3);
    }

    #[test]
    fn test_roster_order_does_not_change_outcome() {
        let cfg = config(0.8);
        let a = agent("a", Vec2::new(200.0, 100.0), Vec2::new(0.1, 0.25));
        let b = agent("b", Vec2::new(210.0, 118.0), Vec2::new(-0.2, -0.1));

        let mut forward = vec![a.clone(), b.clone()];
        let mut reverse = vec![b, a];
        resolve_agent_collisions(&mut forward, &cfg, bounds());
        resolve_agent_collisions(&mut reverse, &cfg, bounds());

        assert!(forward[0].position.approx_eq(reverse[1].position, 1e-4));
        assert!(forward[1].position.approx_eq(reverse[0].position, 1e-4));
        assert!(forward[0].velocity.approx_eq(reverse[1].velocity, 1e-5));
        assert!(forward[1].velocity.approx_eq(reverse[0].velocity, 1e-5));
    }

    #[test]
    fn test_three_in_a_row_is_order_independent() {
        let cfg = config(0.8);
        let a = agent("a", Vec2::new(100.0, 150.0), Vec2::new(0.3, 0.0));
        let b = agent("b", Vec2::new(125.0, 150.0), Vec2::ZERO);
        let c = agent("c", Vec2::new(150.0, 150.0), Vec2::new(-0.3, 0.0));

        let mut forward = vec![a.clone(), b.clone(), c.clone()];
        let mut reverse = vec![c, b, a];
        assert_eq!(resolve_agent_collisions(&mut forward, &cfg, bounds()), 2);
        assert_eq!(resolve_agent_collisions(&mut reverse, &cfg, bounds()), 2);

        for (f, r) in forward.iter().zip(reverse.iter().rev()) {
            assert_eq!(f.id, r.id);
            assert!(f.position.approx_eq(r.position, 1e-4), "{} {:?} {:?}", f.id, f.position, r.position);
            assert!(f.velocity.approx_eq(r.velocity, 1e-5), "{} {:?} {:?}", f.id, f.velocity, r.velocity);
        }

        // The middle agent is hit equally from both sides
        assert!(forward[1].velocity.approx_eq(Vec2::ZERO, 1e-6));
        assert!(forward[0].velocity.approx_eq(Vec2::new(0.03, 0.0), 1e-5));
        assert!(forward[2].velocity.approx_eq(Vec2::new(-0.03, 0.0), 1e-5));
    }

    #[test]
    fn test_shuffled_cluster_is_order_independent() {
        let cfg = config(0.8);
        let r = cfg.radius;
        let mut rng = StdRng::seed_from_u64(9);
        let centre = Vec2::new(200.0, 150.0);

        for _ in 0..50 {
            let cluster: Vec<Agent> = (0..4)
                .map(|k| {
                    let offset = Vec2::new(rng.gen_range(-r..r), rng.gen_range(-r..r));
                    let velocity = Vec2::new(rng.gen_range(-0.3..0.3), rng.gen_range(-0.3..0.3));
                    agent(&format!("a{}", k), centre + offset, velocity)
                })
                .collect();

            let mut forward = cluster.clone();
            let mut reverse: Vec<Agent> = cluster.into_iter().rev().collect();
            resolve_agent_collisions(&mut forward, &cfg, bounds());
            resolve_agent_collisions(&mut reverse, &cfg, bounds());

            // Velocities come only from the simultaneous impulse pass
            for (f, r) in forward.iter().zip(reverse.iter().rev()) {
                assert!(f.velocity.approx_eq(r.velocity, 1e-5), "{} {:?} {:?}", f.id, f.velocity, r.velocity);
            }
        }
    }

    #[test]
    fn test_coincident_agents_are_pushed_apart() {
        let cfg = config(1.0);
        let mut agents = vec![
            agent("a", Vec2::new(200.0, 150.0), Vec2::ZERO),
            agent("b", Vec2::new(200.0, 150.0), Vec2::ZERO),
        ];

        let contacts = resolve_agent_collisions(&mut agents, &cfg, bounds());

        assert_eq!(contacts, 1);
        assert!(agents[0].position.is_finite() && agents[1].position.is_finite());
        assert!(agents[0].velocity.is_finite() && agents[1].velocity.is_finite());
        assert!(agents[0].position.x < agents[1].position.x);
        let distance = agents[0].position.distance_to(agents[1].position);
        assert!((distance - 2.0 * cfg.radius).abs() < 1e-3);
    }

    #[test]
    fn test_pair_jammed_in_corner_ends_separated_and_inside() {
        let cfg = config(1.0);
        let r = cfg.radius;
        let mut agents = vec![
            agent("a", Vec2::new(r, r), Vec2::new(-0.3, 0.0)),
            agent("b", Vec2::new(r + 5.0, r), Vec2::new(-0.3, 0.0)),
        ];

        resolve_agent_collisions(&mut agents, &cfg, bounds());

        for a in &agents {
            assert!(bounds().contains(a.position, r));
        }
        let distance = agents[0].position.distance_to(agents[1].position);
        assert!(distance >= 2.0 * r - 0.01, "distance {}", distance);
    }

    #[test]
    fn test_random_pairs_end_separated() {
        let cfg = config(1.0);
        let r = cfg.radius;
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..500 {
            let a_pos = bounds().random_inside(r, &mut rng);
            let offset = Vec2::new(rng.gen_range(-2.0 * r..2.0 * r), rng.gen_range(-2.0 * r..2.0 * r));
            let b_pos = a_pos + offset;
            let mut agents = vec![
                agent("a", a_pos, Vec2::new(rng.gen_range(-0.3..0.3), rng.gen_range(-0.3..0.3))),
                agent("b", b_pos, Vec2::new(rng.gen_range(-0.3..0.3), rng.gen_range(-0.3..0.3))),
            ];

            resolve_agent_collisions(&mut agents, &cfg, bounds());

            let distance = agents[0].position.distance_to(agents[1].position);
            assert!(distance >= 2.0 * r - 0.01, "distance {} from {:?} {:?}", distance, a_pos, b_pos);
            for a in &agents {
                assert!(bounds().contains(a.position, r));
            }
        }
    }

    #[test]
    fn test_far_apart_no_contact() {
        let cfg = config(1.0);
        let mut agents = vec![
            agent("a", Vec2::new(50.0, 50.0), Vec2::new(0.3, 0.0)),
            agent("b", Vec2::new(300.0, 200.0), Vec2::new(-0.3, 0.0)),
        ];

        assert_eq!(resolve_agent_collisions(&mut agents, &cfg, bounds()), 0);
        assert_eq!(agents[0].position, Vec2::new(50.0, 50.0));
    }
}
