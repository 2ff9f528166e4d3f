//! PetVault Server: connects storage, applies migrations and hosts
//! the grant expiry sweeper.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use color_eyre::eyre::{Context, Result, ensure};
use petvault_access::{AccessConfig, ExpirySweeper, GrantLifecycleManager, OtpIssuer, TracingDelivery};
use petvault_db::{DbConfig, DbManager};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// PetVault access-control service.
#[derive(Debug, Parser)]
#[command(name = "petvault-server", version)]
struct Cli {
    /// SurrealDB WebSocket address.
    #[arg(long, env = "PETVAULT_DB_URL", default_value = "127.0.0.1:8000")]
    db_url: String,

    #[arg(long, env = "PETVAULT_DB_NAMESPACE", default_value = "petvault")]
    db_namespace: String,

    #[arg(long, env = "PETVAULT_DB_DATABASE", default_value = "main")]
    db_database: String,

    #[arg(long, env = "PETVAULT_DB_USERNAME", default_value = "root")]
    db_username: String,

    #[arg(long, env = "PETVAULT_DB_PASSWORD", default_value = "root", hide_env_values = true)]
    db_password: String,

    /// Seconds between grant expiry sweeps.
    #[arg(
        long,
        env = "PETVAULT_SWEEP_INTERVAL_SECS",
        default_value_t = 300,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    sweep_interval_secs: u64,

    /// One-time code lifetime in seconds (at most a day).
    #[arg(
        long,
        env = "PETVAULT_OTP_TTL_SECS",
        default_value_t = 600,
        value_parser = clap::value_parser!(u64).range(1..=86_400)
    )]
    otp_ttl_secs: u64,

    /// Grant lifetime when the request names none, in hours.
    #[arg(
        long,
        env = "PETVAULT_DEFAULT_GRANT_HOURS",
        default_value_t = 24,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    default_grant_hours: u32,

    /// Longest grant an owner may approve, in hours.
    #[arg(
        long,
        env = "PETVAULT_MAX_GRANT_HOURS",
        default_value_t = 72,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    max_grant_hours: u32,

    /// Fallback log filter when `RUST_LOG` is unset.
    #[arg(long, env = "PETVAULT_LOG_LEVEL", default_value = "petvault=info")]
    log_level: String,
}

impl Cli {
    fn db_config(&self) -> DbConfig {
        DbConfig {
            url: self.db_url.clone(),
            namespace: self.db_namespace.clone(),
            database: self.db_database.clone(),
            username: self.db_username.clone(),
            password: self.db_password.clone(),
        }
    }

    fn access_config(&self) -> Result<AccessConfig> {
        ensure!(
            self.default_grant_hours <= self.max_grant_hours,
            "--default-grant-hours ({}) exceeds --max-grant-hours ({})",
            self.default_grant_hours,
            self.max_grant_hours
        );
        Ok(AccessConfig {
            otp_ttl_secs: self.otp_ttl_secs,
            default_grant_duration_hours: self.default_grant_hours,
            max_grant_duration_hours: self.max_grant_hours,
            ..AccessConfig::default()
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    let config = cli.access_config()?;

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&cli.log_level).wrap_err("invalid log filter")?,
    };
    tracing_subscriber::fmt().with_env_filter(filter).json().init();

    info!("Starting PetVault server...");

    let store = DbManager::connect(&cli.db_config())
        .await
        .wrap_err("failed to open the grant store")?;
    let repos = store.repositories();

    let issuer = OtpIssuer::new(repos.otps, repos.directory, TracingDelivery, config.clone());
    let grants = Arc::new(GrantLifecycleManager::new(repos.grants, issuer, config));

    let sweeper = ExpirySweeper::new(Arc::clone(&grants))
        .spawn(Duration::from_secs(cli.sweep_interval_secs));

    tokio::signal::ctrl_c()
        .await
        .wrap_err("failed to listen for shutdown signal")?;

    sweeper.abort();
    info!("PetVault server stopped.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults() {
        let cli = Cli::try_parse_from(["petvault-server"]).unwrap();
        assert_eq!(cli.sweep_interval_secs, 300);
        let config = cli.access_config().unwrap();
        assert_eq!(config.otp_max_attempts, 3);
        assert_eq!(config.default_grant_duration_hours, 24);
        assert_eq!(cli.db_config().namespace, "petvault");
    }

    #[test]
    fn cli_overrides() {
        let cli = Cli::try_parse_from([
            "petvault-server",
            "--sweep-interval-secs",
            "60",
            "--max-grant-hours",
            "48",
        ])
        .unwrap();
        assert_eq!(cli.sweep_interval_secs, 60);
        assert_eq!(cli.access_config().unwrap().max_grant_duration_hours, 48);
    }

    #[test]
    fn zero_sweep_interval_is_rejected() {
        let err = Cli::try_parse_from(["petvault-server", "--sweep-interval-secs", "0"]);
        assert!(err.is_err());
    }

    #[test]
    fn otp_ttl_is_bounded() {
        for ttl in ["0", "86401", "18446744073709551615"] {
            let err = Cli::try_parse_from(["petvault-server", "--otp-ttl-secs", ttl]);
            assert!(err.is_err(), "ttl {ttl} accepted");
        }
    }

    #[test]
    fn max_below_default_duration_is_rejected() {
        let cli = Cli::try_parse_from(["petvault-server", "--max-grant-hours", "12"]).unwrap();
        assert!(cli.access_config().is_err());

        let cli = Cli::try_parse_from([
            "petvault-server",
            "--max-grant-hours",
            "12",
            "--default-grant-hours",
            "8",
        ])
        .unwrap();
        let config = cli.access_config().unwrap();
        assert_eq!(config.default_grant_duration_hours, 8);
        assert_eq!(config.max_grant_duration_hours, 12);
    }
}
