use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};

use crate::domain::dates::Dated;
use crate::domain::period::{PeriodFilter, YearMonth};
use crate::models::{Order, OrderLabel};

#[derive(Default, Clone, Copy)]
struct DayTotals {
  klik_qty: f64,
  paket_qty: f64,
  nominal: f64,
}

impl DayTotals {
  fn add(&mut self, order: &Order) {
    match order.label {
      OrderLabel::Klik => self.klik_qty += order.quantity,
      OrderLabel::Paket => self.paket_qty += order.quantity,
    }
    self.nominal += order.total;
  }
}

pub fn render_orders(
  orders: &[Order],
  month: YearMonth,
  filter: PeriodFilter,
  with_amounts: bool,
  currency: &str,
  today: NaiveDate,
) -> String {
  let (start, end) = filter.window(month);
  let mut days: BTreeMap<u32, DayTotals> = BTreeMap::new();
  let mut totals = DayTotals::default();

  for order in orders {
    let date = order.resolved_date(today);
    if date < start || date > end {
      continue;
    }
    days.entry(date.day()).or_default().add(order);
    totals.add(order);
  }

  let mut lines = vec![format!("Orderan {month} ({filter})")];
  for day in start.day()..=end.day() {
    let line = days.get(&day).copied().unwrap_or_default();
    let mut text = format!("{day}.{}_{}", format_qty(line.klik_qty), format_qty(line.paket_qty));
    if with_amounts && line.nominal != 0.0 {
      text.push(' ');
      text.push_str(&format_amount(line.nominal, currency));
    }
    lines.push(text);
  }

  lines.push(String::new());
  lines.push(format!("Total klik: {}", format_total(totals.klik_qty)));
  lines.push(format!("Total paket: {}", format_total(totals.paket_qty)));
  lines.push(format!("Total: {}", format_total(totals.klik_qty + totals.paket_qty)));
  if with_amounts {
    lines.push(format!("Total nominal: {}", format_amount(totals.nominal, currency)));
  }
  lines.push(String::new());
  lines.join("\n")
}

fn format_qty(value: f64) -> String {
  if value == 0.0 {
    String::new()
  } else {
    format_total(value)
  }
}

fn format_total(value: f64) -> String {
  if value.fract() == 0.0 {
    format!("{}", value as i64)
  } else {
    let text = format!("{value:.2}");
    text.trim_end_matches('0').trim_end_matches('.').to_string()
  }
}

pub fn format_amount(value: f64, currency: &str) -> String {
  let rounded = value.round() as i64;
  let digits = rounded.unsigned_abs().to_string();
  let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
  for (idx, ch) in digits.chars().enumerate() {
    if idx > 0 && (digits.len() - idx) % 3 == 0 {
      grouped.push('.');
    }
    grouped.push(ch);
  }
  let sign = if rounded < 0 { "-" } else { "" };
  format!("{sign}{currency}{grouped}")
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::period::SubPeriod;

  fn order(date: &str, label: OrderLabel, qty: f64, rate: f64) -> Order {
    Order {
      id: 0,
      owner_id: "u-1".into(),
      quantity: qty,
      unit_rate: rate,
      total: qty * rate,
      date: Some(date.into()),
      note: String::new(),
      label,
      created_at: None,
      updated_at: None,
    }
  }

  #[test]
  fn renders_one_line_per_day() {
    let today = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
    let orders = vec![
      order("2024-03-03", OrderLabel::Klik, 5.0, 1000.0),
      order("2024-03-03", OrderLabel::Paket, 2.0, 1500.0),
      order("2024-03-05", OrderLabel::Paket, 1.0, 1500.0),
      order("2024-03-20", OrderLabel::Klik, 9.0, 1000.0),
    ];
    let month = YearMonth::new(2024, 3).unwrap();
    let text = render_orders(&orders, month, PeriodFilter::Sub(SubPeriod::FirstHalf), false, "Rp", today);
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines[0], "Orderan 2024-03 (1-15)");
    assert_eq!(lines[1], "1._");
    assert_eq!(lines[3], "3.5_2");
    assert_eq!(lines[5], "5._1");
    assert_eq!(lines[15], "15._");
    assert!(text.contains("Total klik: 5\n"));
    assert!(text.contains("Total paket: 3\n"));
    assert!(text.contains("Total: 8\n"));
    assert!(!text.contains("Rp"));
  }

  #[test]
  fn currency_variant_appends_amounts() {
    let today = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
    let orders = vec![
      order("2024-03-03", OrderLabel::Klik, 5.0, 1000.0),
      order("2024-03-03", OrderLabel::Paket, 2.0, 1500.0),
    ];
    let month = YearMonth::new(2024, 3).unwrap();
    let text = render_orders(&orders, month, PeriodFilter::Sub(SubPeriod::FirstHalf), true, "Rp", today);
    assert!(text.contains("3.5_2 Rp8.000\n"));
    assert!(text.contains("Total nominal: Rp8.000\n"));
  }

  #[test]
  fn amounts_group_thousands() {
    assert_eq!(format_amount(0.0, "Rp"), "Rp0");
    assert_eq!(format_amount(950.0, "Rp"), "Rp950");
    assert_eq!(format_amount(1234567.0, "Rp"), "Rp1.234.567");
    assert_eq!(format_amount(-25000.0, "Rp"), "-Rp25.000");
    assert_eq!(format_total(2.5), "2.5");
  }
}
