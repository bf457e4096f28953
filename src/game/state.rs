//! World state definitions and structures
//!
//! The world owns every agent and pickup. Agents are kept in roster order so
//! that anything iterating over them (collisions, decision cycles) does so
//! deterministically; an id index gives keyed access.

use std::collections::VecDeque;
use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::RwLock;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::RosterEntry;
use crate::util::vec2::Vec2;

/// Stable agent identifier from the roster
pub type AgentId = String;

/// Pickup identifier, in creation order
pub type PickupId = u64;

/// World shared between the physics driver and the decision driver.
/// Guards must never be held across an `.await`.
pub type SharedWorld = Arc<RwLock<World>>;

/// Arena size; the arena spans `[0, width] x [0, height]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Uniform random point at least `margin` away from every wall
    pub fn random_inside<R: Rng + ?Sized>(&self, margin: f32, rng: &mut R) -> Vec2 {
        Vec2::new(
            margin + rng.gen::<f32>() * (self.width - 2.0 * margin),
            margin + rng.gen::<f32>() * (self.height - 2.0 * margin),
        )
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }

    /// Whether a circle of `radius` at `position` lies inside the walls
    pub fn contains(&self, position: Vec2, radius: f32) -> bool {
        position.x >= radius
            && position.x <= self.width - radius
            && position.y >= radius
            && position.y <= self.height - radius
    }
}

/// One rendered view handed to the completion service, with the heading the
/// agent had at the time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewRecord {
    pub grid: String,
    pub basis: Vec2,
}

/// Agent state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub position: Vec2,
    pub velocity: Vec2,
    /// Desired travel direction: unit length or zero
    pub heading: Vec2,
    pub score: u32,

    pub id: AgentId,
    pub name: String,
    pub color: String,
    /// Model that decides this agent's heading
    pub model: String,
    /// Most recent views, oldest first
    pub history: VecDeque<ViewRecord>,
}

impl Agent {
    pub fn new(entry: &RosterEntry, position: Vec2) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            heading: Vec2::ZERO,
            score: 0,
            id: entry.id.clone(),
            name: entry.name.clone(),
            color: entry.color.clone(),
            model: entry.model.clone(),
            history: VecDeque::new(),
        }
    }

    /// Heading as a unit basis vector; a zero heading stays zero
    pub fn basis(&self) -> Vec2 {
        self.heading.normalize()
    }

    /// Append a view, evicting the oldest beyond `capacity`
    pub fn record_view(&mut self, record: ViewRecord, capacity: usize) {
        self.history.push_back(record);
        while self.history.len() > capacity {
            self.history.pop_front();
        }
    }
}

/// Collectible pickup (fish food / doubloon)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pickup {
    pub id: PickupId,
    pub position: Vec2,
}

/// The single authoritative world
#[derive(Debug, Clone)]
pub struct World {
    pub bounds: Bounds,
    /// Agents in roster order
    agents: Vec<Agent>,
    index: HashMap<AgentId, usize>,
    pub pickups: Vec<Pickup>,
    next_pickup_id: PickupId,
    /// Physics ticks completed
    pub tick: u64,
}

impl World {
    pub fn new(bounds: Bounds) -> Self {
        Self {
            bounds,
            agents: Vec::new(),
            index: HashMap::new(),
            pickups: Vec::new(),
            next_pickup_id: 1,
            tick: 0,
        }
    }

    /// Create a world with every roster member at a random position inside the walls
    pub fn from_roster<R: Rng + ?Sized>(
        bounds: Bounds,
        roster: &[RosterEntry],
        radius: f32,
        rng: &mut R,
    ) -> Self {
        let mut world = Self::new(bounds);
        for entry in roster {
            let position = bounds.random_inside(radius, rng);
            world.add_agent(Agent::new(entry, position));
        }
        world
    }

    pub fn into_shared(self) -> SharedWorld {
        Arc::new(RwLock::new(self))
    }

    /// Add an agent at the end of the roster. An agent with the same id replaces
    /// the existing one in place.
    pub fn add_agent(&mut self, agent: Agent) {
        if let Some(&idx) = self.index.get(&agent.id) {
            self.agents[idx] = agent;
        } else {
            self.index.insert(agent.id.clone(), self.agents.len());
            self.agents.push(agent);
        }
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn agents_mut(&mut self) -> &mut [Agent] {
        &mut self.agents
    }

    pub fn get_agent(&self, id: &str) -> Option<&Agent> {
        self.index.get(id).map(|&idx| &self.agents[idx])
    }

    pub fn get_agent_mut(&mut self, id: &str) -> Option<&mut Agent> {
        match self.index.get(id) {
            Some(&idx) => Some(&mut self.agents[idx]),
            None => None,
        }
    }

    /// Agent ids in roster order
    pub fn roster(&self) -> Vec<AgentId> {
        self.agents.iter().map(|a| a.id.clone()).collect()
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// Split borrow for systems that move agents against pickups
    pub fn agents_and_pickups_mut(&mut self) -> (&mut [Agent], &mut Vec<Pickup>) {
        (&mut self.agents, &mut self.pickups)
    }

    /// Add a pickup and return its id
    pub fn add_pickup(&mut self, position: Vec2) -> PickupId {
        let id = self.next_pickup_id;
        self.next_pickup_id += 1;
        self.pickups.push(Pickup { id, position });
        id
    }

    /// Set an agent's heading. Non-finite input is ignored; anything else is
    /// normalized so the heading is always unit length or zero.
    pub fn set_heading(&mut self, id: &str, heading: Vec2) -> bool {
        if !heading.is_finite() {
            return false;
        }
        match self.get_agent_mut(id) {
            Some(agent) => {
                agent.heading = heading.normalize();
                true
            }
            None => false,
        }
    }

    pub fn total_score(&self) -> u64 {
        self.agents.iter().map(|a| a.score as u64).sum()
    }
}
