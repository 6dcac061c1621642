//! the `check` subcommand - verifies that coffer can start.

use clap::Args;
use color_eyre::eyre::{Context, Result, bail};
use tracing::info;

use super::{ConfigArgs, ensure_sqlite_dir, init_logging};
use crate::Coffer;

/// load config and key, connect and migrate, then report on stored data
#[derive(Args, Debug)]
pub struct CheckCommand {
    #[command(flatten)]
    config: ConfigArgs,
}

impl CheckCommand {
    /// run the check command
    pub async fn run(self) -> Result<()> {
        let config = self.config.into_config()?;
        init_logging(config.log_level.as_deref())?;

        info!(
            database = %config.database.connection_string,
            file_store = ?config.storage.file_store_path,
            "checking coffer"
        );
        ensure_sqlite_dir(&config)?;

        let coffer = Coffer::from_config(&config)
            .await
            .context("failed to start coffer")?;
        coffer.db().ping().await.context("database ping failed")?;
        info!("database reachable and migrated");

        let uow = coffer.db().begin().await?;
        let report = uow.integrity_report().await;
        let report = uow
            .finish(report)
            .await
            .context("failed to build integrity report")?;

        println!("{report}");
        if !report.is_clean() {
            bail!("stored data is inconsistent");
        }
        Ok(())
    }
}
