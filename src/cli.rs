/// CLI Module
///
/// Command-line interface configuration using clap.
use clap::{Parser, ValueEnum};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::db::PoolConfig;
use crate::etl::extract::FetchLimits;
use crate::pipeline::IndexerConfig;
use crate::tzkt::DEFAULT_TZKT_URL;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Tezos Delegation Indexer
///
/// Mirror TzKT delegation operations into PostgreSQL and serve them over HTTP
#[derive(Parser, Debug)]
#[command(name = "tezos-delegation-indexer")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Database connection URL (overrides DATABASE_URL env var)
    #[arg(short = 'd', long, value_name = "URL")]
    pub database_url: Option<String>,

    /// TzKT API root (overrides TZKT_API_URL env var)
    #[arg(short = 't', long, value_name = "URL")]
    pub tzkt_url: Option<String>,

    /// Address the HTTP API binds to
    #[arg(long, value_name = "IP", default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Port the HTTP API listens on
    #[arg(short = 'p', long, value_name = "PORT", default_value = "8088")]
    pub port: u16,

    /// Timeout for TzKT requests in seconds
    #[arg(long, value_name = "SECONDS", default_value = "10")]
    pub http_timeout: u64,

    /// Interval between indexing cycles in seconds
    #[arg(short = 'i', long, value_name = "SECONDS", default_value = "30")]
    pub interval: u64,

    /// Number of recent delegations fetched when the database is empty
    #[arg(long, value_name = "COUNT", default_value = "1000")]
    pub bootstrap_limit: usize,

    /// Maximum delegations fetched per incremental cycle
    #[arg(short = 'b', long, value_name = "COUNT", default_value = "100")]
    pub batch_limit: usize,

    /// Maximum database connections
    #[arg(long, value_name = "COUNT", default_value = "25")]
    pub max_connections: u32,

    /// Idle database connections kept open
    #[arg(long, value_name = "COUNT", default_value = "5")]
    pub min_connections: u32,

    /// Maximum lifetime of a database connection in seconds
    #[arg(long, value_name = "SECONDS", default_value = "300")]
    pub max_lifetime: u64,

    /// Log output format
    #[arg(long, value_enum, default_value = "text")]
    pub log_format: LogFormat,

    /// Run the indexer without the HTTP API
    #[arg(long)]
    pub no_server: bool,

    /// Run a single indexing cycle and exit (the HTTP API is not started)
    #[arg(long)]
    pub once: bool,
}

impl Cli {
    /// Validate CLI arguments
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.interval == 0 {
            anyhow::bail!("Interval must be greater than 0");
        }

        if self.bootstrap_limit == 0 || self.batch_limit == 0 {
            anyhow::bail!("Fetch limits must be greater than 0");
        }

        if self.http_timeout == 0 {
            anyhow::bail!("HTTP timeout must be greater than 0");
        }

        if self.min_connections > self.max_connections {
            anyhow::bail!(
                "Min connections ({}) must be less than or equal to max connections ({})",
                self.min_connections,
                self.max_connections
            );
        }

        Ok(())
    }

    /// Database URL from the flag, falling back to DATABASE_URL
    pub fn resolve_database_url(&self) -> anyhow::Result<String> {
        match &self.database_url {
            Some(url) => Ok(url.clone()),
            None => std::env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL not found in environment. Please check your .env file")),
        }
    }

    /// TzKT URL from the flag, then TZKT_API_URL, then the public mainnet API
    pub fn resolve_tzkt_url(&self) -> String {
        self.tzkt_url
            .clone()
            .or_else(|| std::env::var("TZKT_API_URL").ok())
            .unwrap_or_else(|| DEFAULT_TZKT_URL.to_string())
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            max_connections: self.max_connections,
            min_connections: self.min_connections,
            max_lifetime: Duration::from_secs(self.max_lifetime),
        }
    }

    pub fn indexer_config(&self) -> IndexerConfig {
        IndexerConfig {
            interval: Duration::from_secs(self.interval),
            limits: FetchLimits { bootstrap: self.bootstrap_limit, incremental: self.batch_limit },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("tezos-delegation-indexer").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&[]);
        assert_eq!(cli.port, 8088);
        assert_eq!(cli.bind_addr().to_string(), "0.0.0.0:8088");
        assert_eq!(cli.log_format, LogFormat::Text);

        let indexer = cli.indexer_config();
        assert_eq!(indexer.interval, Duration::from_secs(30));
        assert_eq!(indexer.limits, FetchLimits { bootstrap: 1000, incremental: 100 });

        let pool = cli.pool_config();
        assert_eq!(pool.max_connections, 25);
        assert_eq!(pool.min_connections, 5);
        assert_eq!(pool.max_lifetime, Duration::from_secs(300));

        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_flag_overrides() {
        let cli = parse(&["--tzkt-url", "http://localhost:5000/v1/", "-d", "postgres://x", "--log-format", "json"]);
        assert_eq!(cli.resolve_tzkt_url(), "http://localhost:5000/v1/");
        assert_eq!(cli.resolve_database_url().unwrap(), "postgres://x");
        assert_eq!(cli.log_format, LogFormat::Json);
    }

    #[test]
    fn test_validation() {
        assert!(parse(&["--interval", "0"]).validate().is_err());
        assert!(parse(&["--batch-limit", "0"]).validate().is_err());
        assert!(parse(&["--bootstrap-limit", "0"]).validate().is_err());
        assert!(parse(&["--min-connections", "30"]).validate().is_err());
    }
}
