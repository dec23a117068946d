//! World configuration for the Strata terrain engine.
//!
//! Settings persist to disk as RON files, can be overridden from the command
//! line via clap, and are validated eagerly so that generation never runs
//! against a malformed recipe.

mod cli;
mod config;
mod error;
mod validate;

pub use cli::CliArgs;
pub use config::{
    ArchetypeConfig, BlendConfig, CacheConfig, CarveProfile, ContinentConfig, ErosionConfig,
    HeightRecipe, LogConfig, Ramp, RiverConfig, WorldConfig,
};
pub use error::ConfigError;
