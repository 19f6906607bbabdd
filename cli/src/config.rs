//! Command-line and environment configuration.

use std::time::Duration;

use clap::{Parser, Subcommand};
use url::Url;

use balindex_core::error::IndexerError;
use balindex_core::indexer::IndexerConfig;
use balindex_electrs::{EsploraClientConfig, IndexerBuilder};

use crate::logging::LogConfig;

/// Index address balances from an electrs/Esplora node and serve them over HTTP.
#[derive(Debug, Parser)]
#[command(name = "balindex", version, about, long_about = None)]
pub struct Cli {
    /// Base URL of the electrs/Esplora REST API
    #[arg(long, env = "ELECTRS_URL", default_value = "http://localhost:3000", global = true)]
    pub electrs_url: String,

    /// Port for the query API
    #[arg(long, env = "PORT", default_value_t = 4000, global = true)]
    pub port: u16,

    /// Blocks fetched and persisted per batch
    #[arg(long, env = "BATCH_SIZE", default_value_t = 10, global = true)]
    pub batch_size: u64,

    /// SQLite database file
    #[arg(long, env = "DB_PATH", default_value = "./data/index.db", global = true)]
    pub db_path: String,

    /// Wait after a failure or when caught up, in milliseconds
    #[arg(long, env = "RETRY_DELAY_MS", default_value_t = 5_000, global = true)]
    pub retry_delay_ms: u64,

    /// Upper bound on a single upstream request, in milliseconds
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value_t = 30_000, global = true)]
    pub request_timeout_ms: u64,

    /// Log level or EnvFilter directives (RUST_LOG takes precedence)
    #[arg(long, env = "LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: String,

    /// Emit JSON structured logs
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Run the indexer and the query API until interrupted (default)
    Run,
    /// Print the indexed height and address count from the database
    Status,
    /// Compare a stored balance with the upstream address balance
    Verify {
        /// Address to check
        address: String,
    },
}

impl Cli {
    /// Reject settings that would make the process useless.
    pub fn validate(&self) -> Result<(), IndexerError> {
        let url = Url::parse(&self.electrs_url)
            .map_err(|e| IndexerError::Config(format!("invalid ELECTRS_URL '{}': {e}", self.electrs_url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(IndexerError::Config(format!(
                "ELECTRS_URL must be http or https, got '{}'",
                url.scheme()
            )));
        }
        if self.port == 0 {
            return Err(IndexerError::Config("PORT must be greater than 0".into()));
        }
        if self.batch_size == 0 {
            return Err(IndexerError::Config("BATCH_SIZE must be greater than 0".into()));
        }
        if self.request_timeout_ms == 0 {
            return Err(IndexerError::Config("REQUEST_TIMEOUT_MS must be greater than 0".into()));
        }
        Ok(())
    }

    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Run)
    }

    pub fn indexer_config(&self) -> IndexerConfig {
        IndexerBuilder::new()
            .batch_size(self.batch_size)
            .retry_delay_ms(self.retry_delay_ms)
            .build_config()
    }

    pub fn client_config(&self) -> EsploraClientConfig {
        EsploraClientConfig {
            request_timeout: Duration::from_millis(self.request_timeout_ms),
        }
    }

    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            level: self.log_level.clone(),
            json: self.log_json,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["balindex"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn explicit_flags_override_defaults() {
        let cli = parse(&[
            "--electrs-url",
            "https://blockstream.info/api/",
            "--port",
            "8080",
            "--batch-size",
            "50",
            "--retry-delay-ms",
            "100",
            "status",
        ]);
        assert_eq!(cli.port, 8080);
        assert_eq!(cli.command(), Command::Status);
        assert!(cli.validate().is_ok());

        let cfg = cli.indexer_config();
        assert_eq!(cfg.batch_size, 50);
        assert_eq!(cfg.retry_delay_ms, 100);
    }

    #[test]
    fn verify_takes_an_address() {
        let cli = parse(&["verify", "bc1qabc", "--batch-size", "3"]);
        assert_eq!(cli.command(), Command::Verify { address: "bc1qabc".into() });
        assert_eq!(cli.batch_size, 3);
    }

    #[test]
    fn rejects_zero_batch_size() {
        let cli = parse(&["--electrs-url", "http://localhost:3000", "--batch-size", "0"]);
        assert!(matches!(cli.validate(), Err(IndexerError::Config(_))));
    }

    #[test]
    fn rejects_zero_port() {
        let cli = parse(&["--electrs-url", "http://localhost:3000", "--port", "0"]);
        assert!(matches!(cli.validate(), Err(IndexerError::Config(_))));
    }

    #[test]
    fn rejects_non_http_url() {
        let cli = parse(&["--electrs-url", "ftp://node:21"]);
        assert!(matches!(cli.validate(), Err(IndexerError::Config(_))));

        let cli = parse(&["--electrs-url", "not a url"]);
        assert!(matches!(cli.validate(), Err(IndexerError::Config(_))));
    }

    #[test]
    fn non_numeric_port_is_a_parse_error() {
        assert!(Cli::try_parse_from(["balindex", "--port", "http"]).is_err());
    }

    #[test]
    fn client_timeout_from_millis() {
        let cli = parse(&["--request-timeout-ms", "1500"]);
        assert_eq!(cli.client_config().request_timeout, Duration::from_millis(1500));
    }
}
