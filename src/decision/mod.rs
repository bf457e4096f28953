//! Direction decisions
//!
//! Once per cycle every agent, in roster order, gets its egocentric grid sent
//! to its model, and the reply is parsed into a new heading. The world lock is
//! taken twice per agent, briefly: once to render and record the view, once to
//! write the heading. It is never held while a completion is in flight.
//!
//! ```text
//!   render view ──▶ prompt ──▶ completion ──▶ parse ──▶ set heading
//!   (write lock)               (no lock)                (write lock)
//!                                   │
//!                                   └── 429 ──▶ cooldown: fail fast until it lapses
//! ```

pub mod client;
pub mod parse;
pub mod prompt;
pub mod rate_limit;

pub use client::{CompletionBackend, CompletionReply, CompletionService};
pub use rate_limit::RateLimiter;

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::{DecisionConfig, GridConfig, SimConfig};
use crate::error::{DecisionError, SimError};
use crate::game::grid::render_grid;
use crate::game::state::{SharedWorld, ViewRecord};
use crate::metrics::Metrics;
use crate::net::observer::Observers;
use crate::net::protocol::{LogEvent, ServerMessage};
use crate::util::periodic::PeriodicJob;
use crate::util::vec2::Vec2;

use client::{STATUS_OK, STATUS_TOO_MANY_REQUESTS};
use parse::parse_direction;
use prompt::{build_prompt, PromptContext};

/// Outcome counts for one pass over the roster
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub attempted: usize,
    pub applied: usize,
    pub rate_limited: usize,
    pub malformed: usize,
    pub transport: usize,
}

impl CycleSummary {
    fn record(&mut self, outcome: &Result<Vec2, DecisionError>) {
        self.attempted += 1;
        match outcome {
            Ok(_) => self.applied += 1,
            Err(DecisionError::RateLimited) => self.rate_limited += 1,
            Err(DecisionError::MalformedResponse(_)) => self.malformed += 1,
            Err(DecisionError::Transport(_)) => self.transport += 1,
        }
    }
}

/// What was copied out of the world for one request
struct PreparedView {
    name: String,
    color: String,
    model: String,
    grid: String,
}

pub struct DecisionCoordinator<C> {
    world: SharedWorld,
    service: C,
    limiter: Arc<RateLimiter>,
    observers: Observers,
    metrics: Arc<Metrics>,
    grid: GridConfig,
    decision: DecisionConfig,
}

impl<C: CompletionService> DecisionCoordinator<C> {
    pub fn new(
        world: SharedWorld,
        service: C,
        limiter: Arc<RateLimiter>,
        observers: Observers,
        metrics: Arc<Metrics>,
        config: &SimConfig,
    ) -> Self {
        Self {
            world,
            service,
            limiter,
            observers,
            metrics,
            grid: config.grid.clone(),
            decision: config.decision.clone(),
        }
    }

    pub fn service(&self) -> &C {
        &self.service
    }

    /// Render the agent's view and push it into its history
    fn prepare(&self, agent_id: &str) -> Option<PreparedView> {
        let mut world = self.world.write();
        world.get_agent(agent_id)?;

        let grid = render_grid(&world, agent_id, &self.grid).to_string();
        let agent = world.get_agent_mut(agent_id)?;
        let basis = agent.basis();
        agent.record_view(
            ViewRecord {
                grid: grid.clone(),
                basis,
            },
            self.decision.history_len,
        );

        Some(PreparedView {
            name: agent.name.clone(),
            color: agent.color.clone(),
            model: agent.model.clone(),
            grid,
        })
    }

    /// Ask the agent's model for a direction. Returns the heading and the
    /// reply text it came from.
    async fn request(&self, view: &PreparedView) -> Result<(Vec2, String), DecisionError> {
        if self.limiter.is_exceeded() {
            return Err(DecisionError::RateLimited);
        }

        let ctx = PromptContext {
            name: &view.name,
            grid: &view.grid,
        };
        let prompt = build_prompt(&ctx, &self.grid, &self.decision);
        debug!("Prompt for {}:\n{}", view.name, prompt);

        let reply = self.service.complete(&view.model, &prompt).await?;

        match reply.status {
            STATUS_OK => match parse_direction(&reply.content) {
                Ok(direction) => Ok((direction, reply.content)),
                Err(DecisionError::MalformedResponse(reason)) => Err(DecisionError::MalformedResponse(
                    format!("{} (response: {})", reason, reply.content),
                )),
                Err(e) => Err(e),
            },
            STATUS_TOO_MANY_REQUESTS => {
                self.limiter.trip();
                warn!(
                    "Completion service rate limited us, pausing requests for {:?}",
                    self.decision.rate_limit_cooldown
                );
                Err(DecisionError::RateLimited)
            }
            status => Err(DecisionError::Transport(format!(
                "response status: {} and body: {}",
                status, reply.content
            ))),
        }
    }

    /// One decision attempt for one agent. On success the heading is written;
    /// on failure it is left as it was. Either way exactly one `BotLog` is
    /// published.
    pub async fn decide(&self, agent_id: &str) -> Result<Vec2, DecisionError> {
        let Some(view) = self.prepare(agent_id) else {
            return Err(DecisionError::Transport(format!("agent {} is not in the world", agent_id)));
        };

        let outcome = self.request(&view).await;

        let message = match &outcome {
            Ok((direction, text)) => {
                self.world.write().set_heading(agent_id, *direction);
                info!("{} heading {}", view.name, direction);
                format!("Direction: {}", text)
            }
            Err(e) => {
                debug!("{} keeps its heading: {}", view.name, e);
                format!("Error: Falling back to no movement, {}", e)
            }
        };

        self.metrics.record_decision(outcome.as_ref().map(|_| ()));
        self.metrics.set_rate_limited(self.limiter.is_exceeded());
        self.observers.publish(ServerMessage::BotLog(LogEvent::now(
            agent_id,
            &view.name,
            &view.color,
            message,
        )));

        outcome.map(|(direction, _)| direction)
    }

    /// Decide for every agent in roster order, one request at a time
    pub async fn run_cycle(&self) -> Result<CycleSummary, SimError> {
        let roster = self.world.read().roster();
        let mut summary = CycleSummary::default();
        let mut last_error = None;

        for agent_id in roster {
            let outcome = self.decide(&agent_id).await;
            summary.record(&outcome);
            if let Err(e) = outcome {
                last_error = Some(e);
            }
        }

        match last_error {
            Some(last) if summary.applied == 0 => Err(SimError::NoDecisionsApplied {
                attempted: summary.attempted,
                last,
            }),
            _ => Ok(summary),
        }
    }
}

impl<C: CompletionService> PeriodicJob for DecisionCoordinator<C> {
    fn name(&self) -> &'static str {
        "decisions"
    }

    async fn fire(&mut self) -> Result<(), SimError> {
        let summary = self.run_cycle().await?;
        debug!(
            "Decision cycle: {}/{} applied ({} rate limited, {} malformed, {} transport)",
            summary.applied, summary.attempted, summary.rate_limited, summary.malformed, summary.transport
        );
        Ok(())
    }
}
