mod db;
pub mod detect;
pub mod ignore;
pub mod recheck;
pub mod report;

use std::path::Path;

use chrono::NaiveDate;

use copyguard_api::traits::VideoPlatform;
use copyguard_core::config::AppConfig;
use copyguard_core::models::Catalog;

pub use db::DbHandle;
pub use detect::DetectSummary;
pub use ignore::IgnoreSummary;
pub use recheck::RecheckSummary;
pub use report::ReportSummary;

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("config error: {0}")]
    Config(String),
    #[error("database error: {0}")]
    Database(String),
    #[error("api error: {0}")]
    Api(String),
    #[error("report error: {0}")]
    Report(String),
}

/// Configuration plus an open video store; entry point of every pipeline.
pub struct Runtime {
    db: DbHandle,
    config: AppConfig,
}

impl Runtime {
    /// Open the configured database.
    pub fn new(config: AppConfig) -> Result<Self, RuntimeError> {
        let db_path = config
            .ensure_db_path()
            .map_err(|e| RuntimeError::Config(e.to_string()))?;
        let db = DbHandle::open(&db_path)
            .ok_or_else(|| RuntimeError::Database("failed to open database".into()))?;
        tracing::debug!(path = %db_path.display(), "Database opened");
        Ok(Self { db, config })
    }

    pub fn with_db(config: AppConfig, db: DbHandle) -> Self {
        Self { db, config }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn db_handle(&self) -> DbHandle {
        self.db.clone()
    }

    /// Load the catalog named by `general.data_path`.
    pub fn load_catalog(&self) -> Result<Catalog, RuntimeError> {
        let path = &self.config.general.data_path;
        Catalog::load(path).map_err(|e| {
            RuntimeError::Config(format!("cannot read catalog {}: {e}", path.display()))
        })
    }

    pub async fn detect<P: VideoPlatform>(
        &self,
        platform: &P,
        catalog: &Catalog,
        today: NaiveDate,
    ) -> Result<DetectSummary, RuntimeError> {
        detect::run_detection(platform, &self.db, catalog, &self.config, today).await
    }

    pub async fn recheck<P: VideoPlatform>(
        &self,
        platform: &P,
        today: NaiveDate,
    ) -> Result<RecheckSummary, RuntimeError> {
        recheck::run_recheck(platform, &self.db, &self.config, today).await
    }

    pub async fn report(&self, report_date: NaiveDate) -> Result<ReportSummary, RuntimeError> {
        report::run_report(&self.db, &self.config, report_date).await
    }

    pub async fn apply_ignore_list(
        &self,
        csv_path: &Path,
        platform: &str,
        reason: &str,
        dry_run: bool,
    ) -> Result<IgnoreSummary, RuntimeError> {
        ignore::apply_ignore_list(&self.db, csv_path, platform, reason, dry_run).await
    }
}
