pub mod audit;
pub mod commands;
pub mod db;
pub mod domain;
pub mod error;
pub mod export;
pub mod files;
pub mod logging;
pub mod models;
pub mod reports;
pub mod settings;
pub mod store;

use std::path::PathBuf;

use db::Db;
use error::AppError;
use reports::ReportCache;

pub struct AppState {
  pub db: Db,
  pub app_dir: PathBuf,
  pub reports: ReportCache,
}

impl AppState {
  pub fn open(app_dir: PathBuf) -> Result<Self, AppError> {
    let db = db::init_db(&app_dir)?;
    Ok(Self {
      db,
      app_dir,
      reports: ReportCache::default(),
    })
  }

  pub fn in_memory() -> Result<Self, AppError> {
    Ok(Self {
      db: db::open_in_memory()?,
      app_dir: std::env::temp_dir(),
      reports: ReportCache::default(),
    })
  }
}
