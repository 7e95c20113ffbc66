pub mod fuel_stops;
pub mod ledger;
pub mod motorcycles;
pub mod odometer;
pub mod orders;
pub mod spare_parts;

use chrono::Utc;

use crate::error::AppError;

pub(crate) fn now() -> String {
  Utc::now().to_rfc3339()
}

/// Update/delete statements are owner scoped, so zero rows means "not yours or gone".
pub(crate) fn ensure_found(changed: usize, what: &str) -> Result<(), AppError> {
  if changed == 0 {
    Err(AppError::not_found(what))
  } else {
    Ok(())
  }
}
