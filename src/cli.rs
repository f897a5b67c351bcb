//! Command-line interface definitions for the energy briefing pipeline.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Most behavior lives in the YAML configuration; the flags here select the
//! config directory and override a couple of per-run values.

use clap::Parser;

/// Command-line arguments for the energy briefing pipeline.
///
/// # Examples
///
/// ```sh
/// # Run with the default config directory
/// energy_briefing
///
/// # Run against a different environment's config
/// APP_ENV=prod energy_briefing --config-dir ./config
///
/// # Re-run for a past date with a separate links file
/// energy_briefing --as-of-date 2026-08-28 --links-file ./backfill_links.txt
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Directory holding base.yaml and per-environment overlays
    #[arg(short, long, default_value = "config")]
    pub config_dir: String,

    /// Override the links file path from configuration
    #[arg(short, long)]
    pub links_file: Option<String>,

    /// Run as-of a specific date (YYYY-MM-DD) instead of today
    #[arg(long)]
    pub as_of_date: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(&["energy_briefing"]);

        assert_eq!(cli.config_dir, "config");
        assert!(cli.links_file.is_none());
        assert!(cli.as_of_date.is_none());
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from(&[
            "energy_briefing",
            "--config-dir",
            "/etc/briefing",
            "--links-file",
            "/tmp/links.txt",
            "--as-of-date",
            "2026-08-28",
        ]);

        assert_eq!(cli.config_dir, "/etc/briefing");
        assert_eq!(cli.links_file.as_deref(), Some("/tmp/links.txt"));
        assert_eq!(cli.as_of_date.as_deref(), Some("2026-08-28"));
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from(&["energy_briefing", "-c", "./conf", "-l", "links.txt"]);

        assert_eq!(cli.config_dir, "./conf");
        assert_eq!(cli.links_file.as_deref(), Some("links.txt"));
    }
}
