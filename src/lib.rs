//! LLM Arena Server Library
//!
//! A small physics arena where each agent is steered by a language model.
//! The physics tick and the decision cycle run as independent periodic tasks
//! over one shared world; observers follow along over a TCP feed.
//!
//! # Features
//!
//! - `http_completion` - chat-completions client for the decision cycle (enabled by default).
//!   Without it, or without a token, agents never receive a heading.

pub mod config;
pub mod decision;
pub mod error;
pub mod game;
pub mod metrics;
pub mod net;
pub mod util;
