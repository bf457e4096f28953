use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;
use std::time::Duration;

use crate::game::constants::{decision, grid, net, physics, pickup};
use crate::game::state::Bounds;

/// Which flavour of the game this deployment runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameVariant {
    /// Fish chasing fish food, other fish invisible to each other
    Fish,
    /// Ships chasing doubloons, other ships shown as enemies
    Ship,
}

impl FromStr for GameVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fish" => Ok(Self::Fish),
            "ship" => Ok(Self::Ship),
            other => Err(format!("unknown game variant '{}'", other)),
        }
    }
}

/// Whether an agent's grid view shows the other agents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnemyVisibility {
    Hidden,
    Shown,
}

/// Wire format of the observer feed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedFormat {
    /// One JSON document per line
    JsonLines,
    /// u32 little-endian length prefix followed by a bincode payload
    Binary,
}

impl FromStr for FeedFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" | "jsonl" => Ok(Self::JsonLines),
            "binary" | "bincode" => Ok(Self::Binary),
            other => Err(format!("unknown feed format '{}'", other)),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the observer feed and metrics servers to
    pub bind_address: IpAddr,
    /// Port of the observer feed
    pub observer_port: u16,
    /// Port of the metrics endpoint
    pub metrics_port: u16,
    pub feed_format: FeedFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            observer_port: net::OBSERVER_PORT,
            metrics_port: net::METRICS_PORT,
            feed_format: FeedFormat::JsonLines,
        }
    }
}

impl ServerConfig {
    /// Load config from environment or use defaults
    pub fn load_or_default() -> Self {
        let mut config = Self::default();

        env_override("BIND_ADDRESS", &mut config.bind_address);
        env_override("OBSERVER_PORT", &mut config.observer_port);
        env_override("METRICS_PORT", &mut config.metrics_port);
        env_override("FEED_FORMAT", &mut config.feed_format);

        config
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), String> {
        if self.observer_port == 0 || self.metrics_port == 0 {
            return Err("Ports cannot be 0".to_string());
        }
        if self.observer_port == self.metrics_port {
            return Err("OBSERVER_PORT and METRICS_PORT must differ".to_string());
        }
        Ok(())
    }
}

/// Motion and collision tuning
#[derive(Debug, Clone)]
pub struct PhysicsConfig {
    pub acceleration: f32,
    pub max_speed: f32,
    /// Velocity multiplier per tick, in (0, 1]
    pub friction: f32,
    /// Restitution for walls and agent pairs, in [0, 1]
    pub bounce_factor: f32,
    pub radius: f32,
    pub tick_rate: u32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            acceleration: physics::ACCELERATION,
            max_speed: physics::MAX_SPEED,
            friction: physics::FRICTION,
            bounce_factor: physics::BOUNCE_FACTOR,
            radius: physics::AGENT_RADIUS,
            tick_rate: physics::TICK_RATE,
        }
    }
}

impl PhysicsConfig {
    pub fn tick_duration(&self) -> Duration {
        Duration::from_micros(1_000_000 / self.tick_rate.max(1) as u64)
    }
}

#[derive(Debug, Clone)]
pub struct PickupConfig {
    pub max_count: usize,
    pub collection_margin: f32,
    /// Bernoulli probability of a spawn attempt per physics tick
    pub spawn_chance: f64,
}

impl Default for PickupConfig {
    fn default() -> Self {
        Self {
            max_count: pickup::MAX_COUNT,
            collection_margin: pickup::COLLECTION_MARGIN,
            spawn_chance: pickup::SPAWN_CHANCE,
        }
    }
}

/// Grid view markers and visibility policy
#[derive(Debug, Clone)]
pub struct GridConfig {
    pub width: usize,
    pub empty: char,
    pub pickup: char,
    pub own: char,
    pub enemy: char,
    pub enemies: EnemyVisibility,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            width: grid::WIDTH,
            empty: grid::EMPTY,
            pickup: 'o',
            own: grid::OWN,
            enemy: grid::ENEMY,
            enemies: EnemyVisibility::Hidden,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DecisionConfig {
    /// Per-agent share of the cycle period
    pub per_agent_interval: Duration,
    pub rate_limit_cooldown: Duration,
    pub request_timeout: Duration,
    pub history_len: usize,
    /// Base URL of the completion service; `/chat/completions` is appended
    pub endpoint: String,
    /// Bearer token (GITHUB_TOKEN); without one the offline backend is used
    pub api_token: Option<String>,
    /// What the agents are called in prompts ("fish", "ship")
    pub agent_noun: String,
    /// What the pickups are called in prompts ("fish food", "doubloon")
    pub pickup_noun: String,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            per_agent_interval: Duration::from_millis(decision::PER_AGENT_INTERVAL_MS),
            rate_limit_cooldown: Duration::from_secs(decision::RATE_LIMIT_COOLDOWN_SECS),
            request_timeout: Duration::from_secs(decision::REQUEST_TIMEOUT_SECS),
            history_len: decision::HISTORY_LEN,
            endpoint: decision::DEFAULT_ENDPOINT.to_string(),
            api_token: None,
            agent_noun: "fish".to_string(),
            pickup_noun: "fish food".to_string(),
        }
    }
}

/// One roster member, in the order decisions are requested
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub id: String,
    pub name: String,
    pub color: String,
    /// Model identifier sent to the completion service
    pub model: String,
}

impl RosterEntry {
    pub fn new(id: &str, name: &str, color: &str, model: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            color: color.to_string(),
            model: model.to_string(),
        }
    }
}

fn default_roster() -> Vec<RosterEntry> {
    vec![
        RosterEntry::new("bot2", "GPT 4o-mini", "blue", "gpt-4o-mini"),
        RosterEntry::new("bot4", "Phi-3-small-8k-instruct", "purple", "Phi-3-small-8k-instruct"),
        RosterEntry::new("bot5", "Phi-3-medium-4k-instruct", "#FF8C00", "Phi-3-medium-4k-instruct"),
    ]
}

/// Parse `id|name|color|model;id|name|color|model;...`
pub fn parse_roster(text: &str) -> Result<Vec<RosterEntry>, String> {
    let mut roster: Vec<RosterEntry> = Vec::new();

    for entry in text.split(';').map(str::trim).filter(|e| !e.is_empty()) {
        let fields: Vec<&str> = entry.split('|').map(str::trim).collect();
        let [id, name, color, model] = fields.as_slice() else {
            return Err(format!("roster entry '{}' needs id|name|color|model", entry));
        };
        if id.is_empty() || model.is_empty() {
            return Err(format!("roster entry '{}' has an empty id or model", entry));
        }
        if roster.iter().any(|r| r.id == *id) {
            return Err(format!("duplicate roster id '{}'", id));
        }
        roster.push(RosterEntry::new(id, name, color, model));
    }

    if roster.is_empty() {
        return Err("roster is empty".to_string());
    }
    Ok(roster)
}

/// Everything the simulation needs, for one variant
#[derive(Debug, Clone)]
pub struct SimConfig {
    pub variant: GameVariant,
    pub bounds: Bounds,
    pub physics: PhysicsConfig,
    pub pickups: PickupConfig,
    pub grid: GridConfig,
    pub decision: DecisionConfig,
    pub roster: Vec<RosterEntry>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self::preset(GameVariant::Fish)
    }
}

impl SimConfig {
    /// Built-in tuning for each variant
    pub fn preset(variant: GameVariant) -> Self {
        match variant {
            GameVariant::Fish => Self {
                variant,
                bounds: Bounds::new(400.0, 300.0),
                physics: PhysicsConfig::default(),
                pickups: PickupConfig::default(),
                grid: GridConfig::default(),
                decision: DecisionConfig::default(),
                roster: default_roster(),
            },
            GameVariant::Ship => Self {
                variant,
                bounds: Bounds::new(600.0, 400.0),
                physics: PhysicsConfig {
                    max_speed: 0.5,
                    bounce_factor: 0.8,
                    ..PhysicsConfig::default()
                },
                pickups: PickupConfig::default(),
                grid: GridConfig {
                    pickup: '$',
                    enemies: EnemyVisibility::Shown,
                    ..GridConfig::default()
                },
                decision: DecisionConfig {
                    agent_noun: "ship".to_string(),
                    pickup_noun: "doubloon".to_string(),
                    ..DecisionConfig::default()
                },
                roster: default_roster(),
            },
        }
    }

    /// Load config from environment or use defaults
    pub fn load_or_default() -> Self {
        let mut variant = GameVariant::Fish;
        env_override("GAME_VARIANT", &mut variant);
        let mut config = Self::preset(variant);

        env_override("WORLD_WIDTH", &mut config.bounds.width);
        env_override("WORLD_HEIGHT", &mut config.bounds.height);

        env_override("ACCELERATION", &mut config.physics.acceleration);
        env_override("MAX_SPEED", &mut config.physics.max_speed);
        env_override("FRICTION", &mut config.physics.friction);
        env_override("BOUNCE_FACTOR", &mut config.physics.bounce_factor);
        env_override("AGENT_RADIUS", &mut config.physics.radius);
        env_override("TICK_RATE", &mut config.physics.tick_rate);

        env_override("PICKUP_SPAWN_CHANCE", &mut config.pickups.spawn_chance);
        env_override("GRID_WIDTH", &mut config.grid.width);

        let mut interval_ms = config.decision.per_agent_interval.as_millis() as u64;
        env_override("DECISION_INTERVAL_MS", &mut interval_ms);
        config.decision.per_agent_interval = Duration::from_millis(interval_ms);

        let mut cooldown_secs = config.decision.rate_limit_cooldown.as_secs();
        env_override("RATE_LIMIT_COOLDOWN_SECS", &mut cooldown_secs);
        config.decision.rate_limit_cooldown = Duration::from_secs(cooldown_secs);

        let mut timeout_secs = config.decision.request_timeout.as_secs();
        env_override("REQUEST_TIMEOUT_SECS", &mut timeout_secs);
        config.decision.request_timeout = Duration::from_secs(timeout_secs);

        if let Ok(endpoint) = std::env::var("COMPLETION_ENDPOINT") {
            config.decision.endpoint = endpoint.trim_end_matches('/').to_string();
        }

        config.decision.api_token = std::env::var("GITHUB_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty());

        if let Ok(roster) = std::env::var("ROSTER") {
            match parse_roster(&roster) {
                Ok(parsed) => config.roster = parsed,
                Err(e) => tracing::warn!("Invalid ROSTER ({}), using default", e),
            }
        }

        config
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), String> {
        let r = self.physics.radius;
        if !(r > 0.0) {
            return Err("AGENT_RADIUS must be positive".to_string());
        }
        if !(self.bounds.width > 2.0 * r) || !(self.bounds.height > 2.0 * r) {
            return Err("World must be larger than one agent diameter on both axes".to_string());
        }
        if !(self.physics.friction > 0.0 && self.physics.friction <= 1.0) {
            return Err("FRICTION must be in (0, 1]".to_string());
        }
        if !(0.0..=1.0).contains(&self.physics.bounce_factor) {
            return Err("BOUNCE_FACTOR must be in [0, 1]".to_string());
        }
        if !(self.physics.max_speed > 0.0) || !self.physics.acceleration.is_finite() {
            return Err("MAX_SPEED must be positive and ACCELERATION finite".to_string());
        }
        if self.physics.tick_rate == 0 || self.physics.tick_duration().is_zero() {
            return Err("TICK_RATE must be between 1 and 1000000".to_string());
        }
        if !(0.0..=1.0).contains(&self.pickups.spawn_chance) {
            return Err("PICKUP_SPAWN_CHANCE must be in [0, 1]".to_string());
        }
        if self.grid.width == 0 || self.grid_height() == 0 {
            return Err("GRID_WIDTH too small for the world aspect ratio".to_string());
        }
        if self.decision.per_agent_interval.is_zero() {
            return Err("DECISION_INTERVAL_MS must be positive".to_string());
        }
        if self.roster.is_empty() {
            return Err("Roster cannot be empty".to_string());
        }
        Ok(())
    }

    /// Grid rows: aspect-preserving downscale of the world height
    pub fn grid_height(&self) -> usize {
        (self.grid.width as f32 * (self.bounds.height / self.bounds.width)).floor() as usize
    }

    /// Period of one full decision cycle over the roster
    pub fn decision_cycle_period(&self) -> Duration {
        self.decision.per_agent_interval * self.roster.len().max(1) as u32
    }
}

/// Overwrite `target` with the parsed value of `key`, warning on bad input
fn env_override<T>(key: &str, target: &mut T)
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Ok(raw) = std::env::var(key) {
        match raw.parse::<T>() {
            Ok(parsed) => *target = parsed,
            Err(e) => tracing::warn!("Invalid {} '{}' ({}), using default", key, raw, e),
        }
    }
}
