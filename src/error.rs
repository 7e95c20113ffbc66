use rust_xlsxwriter::XlsxError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Serialize, Deserialize, Clone, PartialEq)]
#[error("{code}: {message}")]
pub struct AppError {
  pub code: String,
  pub message: String,
}

impl AppError {
  pub fn new(code: &str, message: impl Into<String>) -> Self {
    Self {
      code: code.to_string(),
      message: message.into(),
    }
  }

  pub fn not_found(what: &str) -> Self {
    AppError::new("NOT_FOUND", format!("{what} tidak ditemukan"))
  }

  pub fn is_operational(&self) -> bool {
    matches!(
      self.code.as_str(),
      "DB_ERROR" | "IO_ERROR" | "LOCK_ERROR" | "EXPORT" | "JSON_ERROR"
    )
  }
}

impl From<rusqlite::Error> for AppError {
  fn from(err: rusqlite::Error) -> Self {
    AppError::new("DB_ERROR", err.to_string())
  }
}

impl From<std::io::Error> for AppError {
  fn from(err: std::io::Error) -> Self {
    AppError::new("IO_ERROR", err.to_string())
  }
}

impl From<serde_json::Error> for AppError {
  fn from(err: serde_json::Error) -> Self {
    AppError::new("JSON_ERROR", err.to_string())
  }
}

impl From<XlsxError> for AppError {
  fn from(err: XlsxError) -> Self {
    AppError::new("EXPORT", err.to_string())
  }
}

impl<T> From<std::sync::PoisonError<T>> for AppError {
  fn from(_: std::sync::PoisonError<T>) -> Self {
    AppError::new("LOCK_ERROR", "Database lock failed")
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn display_joins_code_and_message() {
    let err = AppError::new("INVALID_QTY", "Jumlah harus lebih besar dari 0");
    assert_eq!(err.to_string(), "INVALID_QTY: Jumlah harus lebih besar dari 0");
  }

  #[test]
  fn sqlite_errors_are_operational() {
    let err: AppError = rusqlite::Error::QueryReturnedNoRows.into();
    assert_eq!(err.code, "DB_ERROR");
    assert!(err.is_operational());
    assert!(!AppError::new("INVALID_DATE", "x").is_operational());
  }
}
