use rusqlite::{params, Connection, OptionalExtension};

use crate::error::AppError;
use crate::models::{Settings, User};

const KEY_USER_ID: &str = "current_user_id";
const KEY_USER_EMAIL: &str = "current_user_email";
const KEY_SERVICE_WARNING: &str = "service_warning_km";
const KEY_CURRENCY: &str = "currency_prefix";

pub const DEFAULT_SERVICE_WARNING_KM: f64 = 1000.0;
pub const DEFAULT_CURRENCY: &str = "Rp";

pub fn ensure_defaults(conn: &Connection) -> Result<(), AppError> {
  conn.execute(
    "INSERT OR IGNORE INTO settings (key, value) VALUES (?1, ?2)",
    params![KEY_SERVICE_WARNING, DEFAULT_SERVICE_WARNING_KM.to_string()],
  )?;
  conn.execute(
    "INSERT OR IGNORE INTO settings (key, value) VALUES (?1, ?2)",
    params![KEY_CURRENCY, DEFAULT_CURRENCY],
  )?;
  Ok(())
}

pub fn get_settings(conn: &Connection) -> Result<Settings, AppError> {
  let mut stmt = conn.prepare("SELECT key, value FROM settings")?;
  let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

  let mut service_warning_km = DEFAULT_SERVICE_WARNING_KM;
  let mut currency_prefix = DEFAULT_CURRENCY.to_string();

  for row in rows {
    let (key, value) = row?;
    match key.as_str() {
      KEY_SERVICE_WARNING => {
        service_warning_km = value.parse().unwrap_or(service_warning_km);
      }
      KEY_CURRENCY => {
        currency_prefix = value;
      }
      _ => {}
    }
  }

  Ok(Settings {
    service_warning_km,
    currency_prefix,
  })
}

pub fn update_settings(conn: &Connection, settings: &Settings) -> Result<(), AppError> {
  if settings.service_warning_km < 0.0 {
    return Err(AppError::new("INVALID_SETTING", "Batas peringatan servis tidak boleh negatif"));
  }
  conn.execute(
    "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
    params![KEY_SERVICE_WARNING, settings.service_warning_km.to_string()],
  )?;
  conn.execute(
    "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
    params![KEY_CURRENCY, settings.currency_prefix.clone()],
  )?;
  Ok(())
}

pub fn current_user(conn: &Connection) -> Result<Option<User>, AppError> {
  let id = get_value(conn, KEY_USER_ID)?;
  let email = get_value(conn, KEY_USER_EMAIL)?;
  Ok(id.filter(|value| !value.trim().is_empty()).map(|id| User {
    id,
    email: email.unwrap_or_default(),
  }))
}

pub fn require_user(conn: &Connection) -> Result<User, AppError> {
  current_user(conn)?.ok_or_else(|| AppError::new("NOT_LOGGED_IN", "Silakan login terlebih dahulu"))
}

pub fn login(conn: &Connection, user: &User) -> Result<(), AppError> {
  if user.id.trim().is_empty() {
    return Err(AppError::new("REQUIRED", "User ID wajib diisi"));
  }
  conn.execute(
    "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
    params![KEY_USER_ID, user.id.trim()],
  )?;
  conn.execute(
    "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
    params![KEY_USER_EMAIL, user.email.trim()],
  )?;
  Ok(())
}

pub fn logout(conn: &Connection) -> Result<(), AppError> {
  conn.execute(
    "DELETE FROM settings WHERE key IN (?1, ?2)",
    params![KEY_USER_ID, KEY_USER_EMAIL],
  )?;
  Ok(())
}

fn get_value(conn: &Connection, key: &str) -> Result<Option<String>, AppError> {
  let value = conn
    .query_row("SELECT value FROM settings WHERE key = ?1", params![key], |row| row.get(0))
    .optional()?;
  Ok(value)
}
