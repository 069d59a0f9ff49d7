//! CLI argument parsing using clap.

use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

use crate::gpio::PinId;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Debounced GPIO button events from sysfs
#[derive(Parser, Debug)]
#[command(
    name = "pinwatch",
    version = env!("CARGO_PKG_VERSION"),
    about = "Debounced GPIO button events from sysfs",
    long_about = "Watch GPIO value files for edges and print one line per settled press.",
    next_line_help = true,
    styles = clap_cargo_style()
)]
pub struct Cli {
    /// Path to a pinwatch.toml file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Watch pins and print settled events
    #[command(
        about = "Watch pins and print settled events",
        after_help = "Examples:\n  pinwatch watch\n  pinwatch watch --pins 27,23 --window-ms 100\n  pinwatch watch --raw --json"
    )]
    Watch {
        /// Pin numbers to watch (defaults to the configured pin table)
        #[arg(short, long, value_delimiter = ',')]
        pins: Vec<PinId>,

        /// Quiet window in milliseconds (overrides config)
        #[arg(short, long)]
        window_ms: Option<u64>,

        /// Channel capacity (overrides config)
        #[arg(long)]
        capacity: Option<usize>,

        /// Print every raw edge without debouncing
        #[arg(long)]
        raw: bool,

        /// Skip running the gpio utility before watching
        #[arg(long)]
        no_configure: bool,

        /// Emit one JSON object per event
        #[arg(long)]
        json: bool,
    },

    /// Configure pins as pulled-up inputs with edge detection
    #[command(about = "Run the gpio utility for each pin")]
    Configure {
        /// Pin numbers to configure (defaults to the configured pin table)
        #[arg(short, long, value_delimiter = ',')]
        pins: Vec<PinId>,
    },

    /// Show current configuration settings
    #[command(about = "Display active settings")]
    Config,

    /// Write a default configuration file
    #[command(about = "Create pinwatch.toml with default settings")]
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_watch_pins() {
        let cli = Cli::parse_from(["pinwatch", "watch", "--pins", "27,23", "--window-ms", "100"]);
        match cli.command {
            Commands::Watch {
                pins, window_ms, raw, ..
            } => {
                assert_eq!(pins, vec![PinId::new(27), PinId::new(23)]);
                assert_eq!(window_ms, Some(100));
                assert!(!raw);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::parse_from(["pinwatch", "config", "--config", "/tmp/p.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/p.toml")));
        assert!(matches!(cli.command, Commands::Config));
    }

    #[test]
    fn test_rejects_bad_pin() {
        assert!(Cli::try_parse_from(["pinwatch", "configure", "--pins", "4,x"]).is_err());
    }
}
