//! Command-line overrides for the world configuration.

use std::path::PathBuf;

use clap::Args;

use crate::WorldConfig;

/// Command-line arguments shared by Strata binaries.
///
/// CLI values override settings loaded from `world.ron`.
#[derive(Args, Debug, Default, Clone)]
pub struct CliArgs {
    /// World seed.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Sea level in blocks.
    #[arg(long)]
    pub sea_level: Option<i32>,

    /// Worker thread count (0 = automatic).
    #[arg(long)]
    pub threads: Option<usize>,

    /// Disable droplet erosion.
    #[arg(long)]
    pub no_erosion: bool,

    /// Disable river carving.
    #[arg(long)]
    pub no_rivers: bool,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl WorldConfig {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(seed) = args.seed {
            self.seed = seed;
        }
        if let Some(sea_level) = args.sea_level {
            self.sea_level = sea_level;
        }
        if let Some(threads) = args.threads {
            self.cache.worker_threads = threads;
        }
        if args.no_erosion {
            self.erosion.enabled = false;
        }
        if args.no_rivers {
            self.rivers.enabled = false;
        }
        if let Some(ref level) = args.log_level {
            self.log.level = level.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_override() {
        let mut config = WorldConfig::default();
        let args = CliArgs {
            seed: Some(1234),
            threads: Some(3),
            no_erosion: true,
            log_level: Some("debug".to_string()),
            ..Default::default()
        };
        config.apply_cli_overrides(&args);
        assert_eq!(config.seed, 1234);
        assert_eq!(config.cache.worker_threads, 3);
        assert!(!config.erosion.enabled);
        assert_eq!(config.log.level, "debug");
        // Non-overridden fields retain defaults
        assert_eq!(config.sea_level, 64);
        assert!(config.rivers.enabled);
    }

    #[test]
    fn test_cli_no_override() {
        let original = WorldConfig::default();
        let mut config = WorldConfig::default();
        config.apply_cli_overrides(&CliArgs::default());
        assert_eq!(config, original);
    }
}
