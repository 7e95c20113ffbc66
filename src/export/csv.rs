use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::NaiveDate;

use crate::domain::dates::Dated;
use crate::error::AppError;
use crate::models::Order;

pub fn export_orders_csv(orders: &[Order], path: &Path, today: NaiveDate) -> Result<usize, AppError> {
  let mut file = BufWriter::new(File::create(path)?);
  writeln!(file, "id,tanggal,label,qty,tarif,total,note")?;

  for order in orders {
    writeln!(
      file,
      "{},{},{},{},{},{},{}",
      order.id,
      order.resolved_date(today).format("%Y-%m-%d"),
      order.label,
      order.quantity,
      order.unit_rate,
      order.total,
      escape_csv(&order.note)
    )?;
  }

  file.flush()?;
  Ok(orders.len())
}

fn escape_csv(value: &str) -> String {
  if value.contains(',') || value.contains('"') || value.contains('\n') {
    format!("\"{}\"", value.replace('"', "\"\""))
  } else {
    value.to_string()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::OrderLabel;

  #[test]
  fn writes_header_and_escapes_notes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("orders.csv");
    let orders = vec![Order {
      id: 7,
      owner_id: "u-1".into(),
      quantity: 2.0,
      unit_rate: 1500.0,
      total: 3000.0,
      date: Some("2024-03-03".into()),
      note: "pasar, \"baru\"".into(),
      label: OrderLabel::Paket,
      created_at: None,
      updated_at: None,
    }];
    let today = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();

    assert_eq!(export_orders_csv(&orders, &path, today).unwrap(), 1);
    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines[0], "id,tanggal,label,qty,tarif,total,note");
    assert_eq!(lines[1], "7,2024-03-03,paket,2,1500,3000,\"pasar, \"\"baru\"\"\"");
  }
}
