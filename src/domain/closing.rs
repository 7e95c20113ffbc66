use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::domain::dates::Dated;
use crate::models::{ClosedPeriod, Order};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClosingSummary {
  pub total_orders: i64,
  pub qty_by_label: BTreeMap<String, f64>,
  pub nominal_by_label: BTreeMap<String, f64>,
  pub total_qty: f64,
  pub total_nominal: f64,
}

pub fn orders_in_range<'a>(orders: &'a [Order], start: NaiveDate, end: NaiveDate, today: NaiveDate) -> Vec<&'a Order> {
  orders
    .iter()
    .filter(|order| {
      let date = order.resolved_date(today);
      date >= start && date < end
    })
    .collect()
}

pub fn summarize(orders: &[&Order]) -> Option<ClosingSummary> {
  if orders.is_empty() {
    return None;
  }

  let summary = orders.iter().fold(ClosingSummary::default(), |mut acc, order| {
    let label = order.label.as_str().to_string();
    *acc.qty_by_label.entry(label.clone()).or_insert(0.0) += order.quantity;
    *acc.nominal_by_label.entry(label).or_insert(0.0) += order.total;
    acc.total_qty += order.quantity;
    acc.total_nominal += order.total;
    acc.total_orders += 1;
    acc
  });
  Some(summary)
}

pub fn is_covered(date: NaiveDate, ledger: &[ClosedPeriod]) -> bool {
  ledger.iter().any(|entry| entry.covers(date))
}

pub fn open_orders(orders: Vec<Order>, ledger: &[ClosedPeriod], today: NaiveDate) -> Vec<Order> {
  orders
    .into_iter()
    .filter(|order| !is_covered(order.resolved_date(today), ledger))
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::period::SubPeriod;
  use crate::models::OrderLabel;

  fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  fn order(id: i64, date: Option<&str>, label: OrderLabel, qty: f64, rate: f64) -> Order {
    Order {
      id,
      owner_id: "u-1".into(),
      quantity: qty,
      unit_rate: rate,
      total: qty * rate,
      date: date.map(str::to_string),
      note: String::new(),
      label,
      created_at: None,
      updated_at: None,
    }
  }

  fn entry(start: NaiveDate, end: NaiveDate) -> ClosedPeriod {
    ClosedPeriod {
      id: 1,
      owner_id: "u-1".into(),
      year_month: "2024-03".into(),
      sub_period: SubPeriod::FirstHalf,
      start_date: start,
      end_date: end,
      total_orders: 0,
      qty_by_label: BTreeMap::new(),
      nominal_by_label: BTreeMap::new(),
      total_qty: 0.0,
      total_nominal: 0.0,
      created_at: String::new(),
    }
  }

  #[test]
  fn summary_buckets_by_label() {
    let today = day(2024, 4, 1);
    let orders = vec![
      order(1, Some("2024-03-03"), OrderLabel::Klik, 5.0, 1000.0),
      order(2, Some("2024-03-03"), OrderLabel::Paket, 2.0, 1500.0),
      order(3, Some("2024-03-16"), OrderLabel::Klik, 9.0, 1000.0),
    ];
    let selected = orders_in_range(&orders, day(2024, 3, 1), day(2024, 3, 16), today);
    let summary = summarize(&selected).unwrap();

    assert_eq!(summary.total_orders, 2);
    assert_eq!(summary.total_qty, 7.0);
    assert_eq!(summary.total_nominal, 8000.0);
    assert_eq!(summary.qty_by_label["klik"], 5.0);
    assert_eq!(summary.qty_by_label["paket"], 2.0);
    assert_eq!(summary.nominal_by_label["klik"], 5000.0);
    assert_eq!(summary.nominal_by_label["paket"], 3000.0);
  }

  #[test]
  fn empty_selection_has_no_summary() {
    assert!(summarize(&[]).is_none());
  }

  #[test]
  fn open_orders_checks_every_ledger_entry() {
    let today = day(2024, 4, 20);
    let orders = vec![
      order(1, Some("2024-03-03"), OrderLabel::Klik, 1.0, 1000.0),
      order(2, Some("2024-03-20"), OrderLabel::Klik, 1.0, 1000.0),
      order(3, Some("2024-04-02"), OrderLabel::Klik, 1.0, 1000.0),
      order(4, None, OrderLabel::Klik, 1.0, 1000.0),
    ];
    let ledger = vec![
      entry(day(2024, 3, 1), day(2024, 3, 16)),
      entry(day(2024, 3, 16), day(2024, 4, 1)),
    ];
    let open: Vec<i64> = open_orders(orders, &ledger, today).iter().map(|o| o.id).collect();
    assert_eq!(open, vec![3, 4]);
  }
}
