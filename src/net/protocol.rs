//! Observer feed messages
//!
//! Observers receive one `GameState` per physics tick and one `BotLog` per
//! decision attempt. Messages are externally tagged so the same types work for
//! the JSON-lines feed and the bincode feed.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::game::state::{Agent, AgentId, Bounds, Pickup, World};

/// Messages from server to observers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ServerMessage {
    /// Full world state
    GameState(WorldSnapshot),
    /// Outcome of one decision attempt
    BotLog(LogEvent),
}

/// Full world state after a tick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub tick: u64,
    pub bounds: Bounds,
    /// Every agent, keyed by id, including its recent views
    pub agents: HashMap<AgentId, Agent>,
    pub pickups: Vec<Pickup>,
    /// Whether the completion cooldown is active
    pub rate_limited: bool,
}

impl WorldSnapshot {
    pub fn from_world(world: &World, rate_limited: bool) -> Self {
        Self {
            tick: world.tick,
            bounds: world.bounds,
            agents: world
                .agents()
                .iter()
                .map(|agent| (agent.id.clone(), agent.clone()))
                .collect(),
            pickups: world.pickups.clone(),
            rate_limited,
        }
    }
}

/// Decision log line shown next to the arena
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    pub agent_id: AgentId,
    pub name: String,
    pub color: String,
    pub message: String,
    /// Local wall-clock time, `HH:MM:SS`
    pub timestamp: String,
}

impl LogEvent {
    /// Stamp an event with the current local time
    pub fn now(agent_id: &str, name: &str, color: &str, message: String) -> Self {
        Self {
            agent_id: agent_id.to_string(),
            name: name.to_string(),
            color: color.to_string(),
            message,
            timestamp: chrono::Local::now().format("%H:%M:%S").to_string(),
        }
    }
}

/// Encode a message as one JSON line, newline included
pub fn encode_json_line(message: &ServerMessage) -> Result<Vec<u8>, EncodeError> {
    let mut line = serde_json::to_vec(message).map_err(|e| EncodeError(e.to_string()))?;
    line.push(b'\n');
    Ok(line)
}

/// Encode a message using bincode (legacy config: fixed-size integers)
pub fn encode_binary<T: Serialize>(message: &T) -> Result<Vec<u8>, EncodeError> {
    bincode::serde::encode_to_vec(message, bincode::config::legacy())
        .map_err(|e| EncodeError(e.to_string()))
}

/// Decode a message using bincode
pub fn decode_binary<T: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<T, DecodeError> {
    bincode::serde::decode_from_slice(data, bincode::config::legacy())
        .map(|(msg, _)| msg)
        .map_err(|e| DecodeError(e.to_string()))
}

#[derive(Debug, thiserror::Error)]
#[error("Encode error: {0}")]
pub struct EncodeError(String);

#[derive(Debug, thiserror::Error)]
#[error("Decode error: {0}")]
pub struct DecodeError(String);
