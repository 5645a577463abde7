/// StoryPeak - educational content generation service
///
/// Core library providing cached story generation, word-scramble sets,
/// and image resolution for a children's learning game.

pub mod api;
pub mod config;
pub mod core;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
