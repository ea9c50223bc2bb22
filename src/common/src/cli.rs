use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Configuration;

/// Common CLI arguments
#[derive(Parser, Debug, Clone)]
pub struct CommonArgs {
    #[arg(long, global = true, help = "Configuration file path")]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(short, long, global = true, help = "Enable quiet mode (minimal output)")]
    pub quiet: bool,
}

/// Store selection and run flags for commands that touch the bucket
#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    #[arg(long, help = "Bucket name, or a storage URL (s3://, file://, memory://)")]
    pub bucket: String,

    #[arg(long, help = "Bucket region")]
    pub region: String,

    #[arg(long, help = "Custom S3-compatible endpoint")]
    pub endpoint: Option<String>,

    #[arg(long, help = "Allow plain HTTP to the endpoint")]
    pub allow_http: bool,

    #[arg(long, help = "Log what would be deleted without deleting")]
    pub dry_run: bool,

    #[arg(long, help = "Evaluate as of this RFC 3339 instant instead of the system clock")]
    pub now: Option<DateTime<Utc>>,

    #[arg(long, help = "Exit non-zero when any deletion fails")]
    pub strict: bool,
}

impl StoreArgs {
    /// Overlay the flags onto a loaded configuration. Boolean flags can only
    /// switch a setting on.
    pub fn apply(&self, config: &mut Configuration) {
        config.storage.bucket = self.bucket.clone();
        config.storage.region = self.region.clone();
        if let Some(endpoint) = &self.endpoint {
            config.storage.endpoint = Some(endpoint.clone());
        }
        config.storage.allow_http |= self.allow_http;
        config.retention.dry_run |= self.dry_run;
        config.retention.strict |= self.strict;
    }
}

/// Subcommands that only inspect configuration
#[derive(Subcommand, Debug, Clone)]
pub enum CommonCommands {
    /// Show current configuration and exit
    Config {
        #[arg(long, help = "Show configuration in JSON format")]
        json: bool,
    },
    /// Validate configuration and exit
    Validate,
    /// Show version information and exit
    Version,
}

/// Utility functions for CLI operations
pub mod utils {
    use super::*;
    use anyhow::{Context, Result};
    use tracing_subscriber::EnvFilter;

    /// Initialize logging on stderr. `--quiet` and `--verbose` win over `RUST_LOG`.
    pub fn init_logging(args: &CommonArgs) {
        let filter = if args.quiet {
            EnvFilter::new("warn")
        } else if args.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
        };

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    /// Load configuration with optional override from CLI
    pub fn load_config(config_path: Option<&PathBuf>) -> Result<Configuration> {
        match config_path {
            Some(path) => {
                log::info!("Loading configuration from: {}", path.display());
                Configuration::load_from_path(path).context("Failed to load configuration")
            }
            None => Configuration::load().context("Failed to load configuration"),
        }
    }

    /// Display configuration in human-readable or JSON format
    pub fn display_config(config: &Configuration, json: bool) -> Result<()> {
        if json {
            let json = serde_json::to_string_pretty(config)
                .context("Failed to serialize configuration to JSON")?;
            println!("{json}");
        } else {
            print!("{}", render_config(config));
        }
        Ok(())
    }

    fn render_config(config: &Configuration) -> String {
        let storage = &config.storage;
        let retention = &config.retention;
        let policy = &retention.policy;
        let or_unset = |value: &str| {
            if value.is_empty() {
                "(unset)".to_string()
            } else {
                value.to_string()
            }
        };

        let mut out = String::new();
        out.push_str("Snapshot Lifecycle Configuration:\n");
        out.push_str("=================================\n");
        out.push_str(&format!("Bucket: {}\n", or_unset(&storage.bucket)));
        out.push_str(&format!("Region: {}\n", or_unset(&storage.region)));
        out.push_str(&format!(
            "Endpoint: {}\n",
            storage.endpoint.as_deref().unwrap_or("(default)")
        ));
        out.push_str(&format!("Allow HTTP: {}\n", storage.allow_http));
        out.push_str(&format!("Dry run: {}\n", retention.dry_run));
        out.push_str(&format!("Strict: {}\n", retention.strict));
        out.push_str(&format!("Purge invalid: {}\n", retention.purge_invalid));
        out.push_str(&format!(
            "Run budget: {}\n",
            retention
                .run_budget
                .map(|d| humantime::format_duration(d).to_string())
                .unwrap_or_else(|| "unlimited".to_string())
        ));
        out.push_str(&format!(
            "Keep all within: {}\n",
            humantime::format_duration(policy.keep_all_within)
        ));
        out.push_str(&format!(
            "Daily checkpoints within: {}\n",
            humantime::format_duration(policy.daily_within)
        ));
        out.push_str(&format!(
            "Weekly checkpoints within: {}\n",
            humantime::format_duration(policy.weekly_within)
        ));
        out.push_str(&format!(
            "Weekly checkpoint day: {}\n",
            policy.weekly_checkpoint_day
        ));
        out
    }

    /// Validate configuration and report any issues
    pub fn validate_config(config: &Configuration) -> Result<()> {
        log::info!("Validating configuration...");

        config
            .retention
            .validate()
            .context("Invalid retention configuration")?;

        let storage = &config.storage;
        if storage.is_configured() && !storage.bucket.contains("://") && storage.region.is_empty()
        {
            anyhow::bail!("Region is required for bucket '{}'", storage.bucket);
        }

        log::info!("Configuration validation passed");
        Ok(())
    }

    /// Handle subcommands that never touch the bucket
    ///
    /// `version` is the line printed by the `version` subcommand, built by the
    /// binary with [`version_info`].
    pub fn handle_common_command(
        command: &CommonCommands,
        config: &Configuration,
        version: &str,
    ) -> Result<()> {
        match command {
            CommonCommands::Config { json } => display_config(config, *json),
            CommonCommands::Validate => validate_config(config),
            CommonCommands::Version => {
                println!("{version}");
                Ok(())
            }
        }
    }

    /// Standard version information. `name` and `version` come from the
    /// calling binary's `CARGO_PKG_*` variables.
    pub fn version_info(name: &str, version: &str) -> String {
        format!("{name} {version} ({})", env!("CARGO_PKG_RUST_VERSION"))
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use std::time::Duration;

        #[test]
        fn test_render_config_defaults() {
            let rendered = render_config(&Configuration::default());
            assert!(rendered.contains("Bucket: (unset)"));
            assert!(rendered.contains("Run budget: unlimited"));
            assert!(rendered.contains("Keep all within: 1day"));
            assert!(rendered.contains("Weekly checkpoints within: 30days"));
            assert!(rendered.contains("Weekly checkpoint day: Fri"));
        }

        #[test]
        fn test_validate_rejects_bad_policy() {
            let mut config = Configuration::default();
            config.retention.policy.daily_within = Duration::from_secs(3600);
            let err = validate_config(&config).unwrap_err();
            assert!(format!("{err:#}").contains("Invalid retention configuration"));
        }

        #[test]
        fn test_validate_requires_region_for_bucket_name() {
            let mut config = Configuration::default();
            config.storage.bucket = "backups".to_string();
            assert!(validate_config(&config).is_err());

            config.storage.region = "us-east-1".to_string();
            assert!(validate_config(&config).is_ok());

            config.storage.bucket = "memory://".to_string();
            config.storage.region.clear();
            assert!(validate_config(&config).is_ok());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(flatten)]
        common: CommonArgs,
        #[command(flatten)]
        store: StoreArgs,
    }

    #[test]
    fn test_cli_definition() {
        TestCli::command().debug_assert();
    }

    #[test]
    fn test_bucket_and_region_are_required() {
        assert!(TestCli::try_parse_from(["test", "--region", "us-east-1"]).is_err());
        assert!(TestCli::try_parse_from(["test", "--bucket", "backups"]).is_err());
    }

    #[test]
    fn test_store_args_override_config() {
        let cli = TestCli::try_parse_from([
            "test",
            "--bucket",
            "backups",
            "--region",
            "eu-west-1",
            "--dry-run",
            "--now",
            "2026-02-27T12:00:00Z",
        ])
        .unwrap();

        let mut config = Configuration::default();
        config.storage.endpoint = Some("http://localhost:9000".to_string());
        config.retention.strict = true;
        cli.store.apply(&mut config);

        assert_eq!(config.storage.bucket, "backups");
        assert_eq!(config.storage.region, "eu-west-1");
        assert_eq!(
            config.storage.endpoint.as_deref(),
            Some("http://localhost:9000")
        );
        assert!(config.retention.dry_run);
        assert!(config.retention.strict);
        assert_eq!(
            cli.store.now.map(|now| now.to_rfc3339()),
            Some("2026-02-27T12:00:00+00:00".to_string())
        );
    }

    #[test]
    fn test_invalid_now_is_rejected() {
        let result = TestCli::try_parse_from([
            "test", "--bucket", "b", "--region", "r", "--now", "yesterday",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_version_info() {
        let version = utils::version_info("snapshot-lifecycle", "1.2.3");
        assert!(version.starts_with("snapshot-lifecycle 1.2.3 ("));
    }
}
