//! Game session - drives the physics tick and publishes state to observers

use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use tracing::warn;

use crate::config::SimConfig;
use crate::decision::RateLimiter;
use crate::error::SimError;
use crate::game::game_loop::{sanitize, GameLoop, TickReport};
use crate::game::state::SharedWorld;
use crate::metrics::Metrics;
use crate::net::observer::Observers;
use crate::net::protocol::{ServerMessage, WorldSnapshot};
use crate::util::periodic::PeriodicJob;

/// Physics driver: owns the tick loop state, shares the world
pub struct GameSession {
    world: SharedWorld,
    game_loop: GameLoop,
    rng: StdRng,
    period: Duration,
    limiter: Arc<RateLimiter>,
    observers: Observers,
    metrics: Arc<Metrics>,
}

impl GameSession {
    pub fn new(
        world: SharedWorld,
        config: &SimConfig,
        rng: StdRng,
        limiter: Arc<RateLimiter>,
        observers: Observers,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            world,
            game_loop: GameLoop::new(config),
            rng,
            period: config.physics.tick_duration(),
            limiter,
            observers,
            metrics,
        }
    }

    /// Tick period
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Run one tick under the world lock, then publish the snapshot.
    ///
    /// Non-finite agent state is repaired before and after the tick; a repair
    /// is reported as `NonFiniteState` once the tick has completed.
    pub fn tick(&mut self) -> Result<TickReport, SimError> {
        let started = Instant::now();
        let publish = self.observers.observer_count() > 0;

        let (report, repaired, snapshot) = {
            let mut world = self.world.write();

            let mut repaired = sanitize(&mut world);
            let report = self.game_loop.tick(&mut world, &mut self.rng);
            repaired.extend(sanitize(&mut world));

            self.metrics.record_tick(&report, world.agent_count(), world.pickups.len());
            let snapshot = publish.then(|| WorldSnapshot::from_world(&world, self.limiter.is_exceeded()));
            (report, repaired, snapshot)
        };

        self.metrics.record_tick_time(started.elapsed());
        if let Some(snapshot) = snapshot {
            self.observers.publish(ServerMessage::GameState(snapshot));
        }

        match repaired.into_iter().next() {
            Some(agent) => {
                warn!("Reset non-finite state of {} at tick {}", agent, report.tick);
                Err(SimError::NonFiniteState { agent })
            }
            None => Ok(report),
        }
    }
}

impl PeriodicJob for GameSession {
    fn name(&self) -> &'static str {
        "physics"
    }

    async fn fire(&mut self) -> Result<(), SimError> {
        self.tick().map(|_| ())
    }
}
