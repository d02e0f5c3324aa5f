//! State module for tracking the crawl session
//!
//! # Components
//!
//! - `EngineState`: The externally visible engine state (Idle, Crawling, Paused)
//! - `EngineControl`: The cooperative control flags and session counter shared
//!   between the crawl loop and the handles that pause or stop it

mod engine_state;

pub use engine_state::{EngineControl, EngineState, SessionId};
