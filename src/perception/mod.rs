// Perception module
// Runs the capture -> calibrate -> match cycle on a fixed tick and publishes
// a consistent snapshot of what is on screen.

pub mod channels;
pub mod config;
pub mod engine;
pub mod perception_loop;
pub mod state;
pub mod templates;
pub mod types;


// Re-export the main types and functions for easy access
pub use channels::create_perception_channels;
pub use config::{PerceptionConfig, create_precise_config, create_replay_config};
pub use engine::PerceptionEngine;
pub use perception_loop::PerceptionLoop;
pub use state::{PerceptionState, StateReader, StateWriter, perception_state_channel};
pub use templates::{TemplateKind, TemplateSet};
pub use types::{PerceptionCommand, TickOutcome};
