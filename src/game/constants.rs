/// Physics constants. Velocities and accelerations are in world units per tick,
/// there is no dt scaling: one physics tick is one integration step.
pub mod physics {
    /// Velocity added per tick along the heading
    pub const ACCELERATION: f32 = 0.2;
    /// Maximum speed magnitude (units per tick)
    pub const MAX_SPEED: f32 = 0.3;
    /// Multiplicative friction applied every tick
    /// Applied as: velocity *= FRICTION
    pub const FRICTION: f32 = 0.98;
    /// Restitution for wall bounces and agent collisions (1.0 = perfectly elastic)
    pub const BOUNCE_FACTOR: f32 = 1.0;
    /// Collision radius of every agent
    pub const AGENT_RADIUS: f32 = 15.0;
    /// Server tick rate in Hz
    pub const TICK_RATE: u32 = 60;
    /// Tick duration in microseconds
    pub const TICK_DURATION_US: u64 = 1_000_000 / TICK_RATE as u64;
}

/// Collision resolution constants
pub mod collision {
    /// Centres closer than this are treated as coincident and pushed apart along +x
    pub const COINCIDENT_EPSILON: f32 = 1e-4;
    /// Positional relaxation passes run after the impulse pass
    pub const SEPARATION_PASSES: usize = 16;
}

/// Pickup (fish food / doubloon) constants
pub mod pickup {
    /// Maximum pickups present in the arena at once
    pub const MAX_COUNT: usize = 2;
    /// Extra reach beyond the agent radius within which a pickup is collected
    pub const COLLECTION_MARGIN: f32 = 10.0;
    /// Probability of a spawn attempt on any given physics tick
    pub const SPAWN_CHANCE: f64 = 0.9;
}

/// ASCII grid view constants
pub mod grid {
    /// Number of grid columns; rows follow the world aspect ratio
    pub const WIDTH: usize = 20;
    pub const EMPTY: char = '.';
    pub const OWN: char = 'S';
    pub const ENEMY: char = 'E';
}

/// Direction decision constants
pub mod decision {
    /// Per-agent share of the decision cycle. The cycle period is this value
    /// multiplied by the roster size, which keeps the aggregate request rate
    /// to the completion service constant.
    pub const PER_AGENT_INTERVAL_MS: u64 = 3500;
    /// Cooldown after the completion service answers 429
    pub const RATE_LIMIT_COOLDOWN_SECS: u64 = 10 * 60;
    /// Timeout for a single completion request
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;
    /// View records kept per agent
    pub const HISTORY_LEN: usize = 3;
    /// Default completion endpoint (GitHub Models / Azure AI inference)
    pub const DEFAULT_ENDPOINT: &str = "https://models.inference.ai.azure.com";
}

/// Networking constants
pub mod net {
    /// Observer feed port
    pub const OBSERVER_PORT: u16 = 3000;
    /// Metrics HTTP port
    pub const METRICS_PORT: u16 = 9090;
    /// Buffered outward events per observer before it starts lagging
    pub const OBSERVER_CHANNEL_CAPACITY: usize = 256;
    /// Largest frame written to a binary observer feed
    pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;
}
