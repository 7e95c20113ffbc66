use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

const MONTH_LABELS: [&str; 12] = [
  "Jan", "Feb", "Mar", "Apr", "Mei", "Jun", "Jul", "Agu", "Sep", "Okt", "Nov", "Des",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct YearMonth {
  pub year: i32,
  pub month: u32,
}

impl YearMonth {
  pub fn new(year: i32, month: u32) -> Result<Self, AppError> {
    if !(1..=12).contains(&month) {
      return Err(AppError::new("INVALID_MONTH", "Bulan harus antara 1 dan 12"));
    }
    Ok(Self { year, month })
  }

  pub fn of(date: NaiveDate) -> Self {
    Self {
      year: date.year(),
      month: date.month(),
    }
  }

  pub fn first_day(&self) -> NaiveDate {
    NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
  }

  pub fn next(&self) -> Self {
    if self.month == 12 {
      Self { year: self.year + 1, month: 1 }
    } else {
      Self { year: self.year, month: self.month + 1 }
    }
  }

  pub fn prev(&self) -> Self {
    if self.month == 1 {
      Self { year: self.year - 1, month: 12 }
    } else {
      Self { year: self.year, month: self.month - 1 }
    }
  }

  pub fn last_day(&self) -> NaiveDate {
    self.next().first_day() - Duration::days(1)
  }

  pub fn days_in_month(&self) -> u32 {
    self.last_day().day()
  }

  pub fn contains(&self, date: NaiveDate) -> bool {
    date.year() == self.year && date.month() == self.month
  }

  pub fn short_label(&self) -> String {
    let name = MONTH_LABELS[(self.month as usize).saturating_sub(1) % 12];
    format!("{name} {}", self.year)
  }
}

impl fmt::Display for YearMonth {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:04}-{:02}", self.year, self.month)
  }
}

impl FromStr for YearMonth {
  type Err = AppError;

  fn from_str(value: &str) -> Result<Self, Self::Err> {
    let invalid = || AppError::new("INVALID_MONTH", "Bulan harus YYYY-MM");
    let (year, month) = value.trim().split_once('-').ok_or_else(invalid)?;
    if year.len() != 4 || month.is_empty() || month.len() > 2 {
      return Err(invalid());
    }
    let year: i32 = year.parse().map_err(|_| invalid())?;
    let month: u32 = month.parse().map_err(|_| invalid())?;
    YearMonth::new(year, month)
  }
}

impl TryFrom<String> for YearMonth {
  type Error = AppError;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    value.parse()
  }
}

impl From<YearMonth> for String {
  fn from(value: YearMonth) -> Self {
    value.to_string()
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SubPeriod {
  #[serde(rename = "1-15")]
  FirstHalf,
  #[serde(rename = "16-31")]
  SecondHalf,
}

impl SubPeriod {
  pub fn for_day(day: u32) -> Self {
    if day <= 15 {
      SubPeriod::FirstHalf
    } else {
      SubPeriod::SecondHalf
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      SubPeriod::FirstHalf => "1-15",
      SubPeriod::SecondHalf => "16-31",
    }
  }

  pub fn contains_day(&self, day: u32) -> bool {
    Self::for_day(day) == *self
  }

  pub fn day_range(&self, month: YearMonth) -> (u32, u32) {
    match self {
      SubPeriod::FirstHalf => (1, 15),
      SubPeriod::SecondHalf => (16, month.days_in_month()),
    }
  }
}

impl fmt::Display for SubPeriod {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for SubPeriod {
  type Err = AppError;

  fn from_str(value: &str) -> Result<Self, Self::Err> {
    match value.trim() {
      "1-15" => Ok(SubPeriod::FirstHalf),
      "16-31" => Ok(SubPeriod::SecondHalf),
      _ => Err(AppError::new("INVALID_PERIOD", "Periode harus 1-15 atau 16-31")),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PeriodFilter {
  #[default]
  All,
  Sub(SubPeriod),
}

impl PeriodFilter {
  pub fn as_str(&self) -> &'static str {
    match self {
      PeriodFilter::All => "all",
      PeriodFilter::Sub(sub) => sub.as_str(),
    }
  }

  pub fn matches_day(&self, day: u32) -> bool {
    match self {
      PeriodFilter::All => true,
      PeriodFilter::Sub(sub) => sub.contains_day(day),
    }
  }

  pub fn window(&self, month: YearMonth) -> (NaiveDate, NaiveDate) {
    let (from, to) = match self {
      PeriodFilter::All => (1, month.days_in_month()),
      PeriodFilter::Sub(sub) => sub.day_range(month),
    };
    (day_of(month, from), day_of(month, to))
  }
}

impl fmt::Display for PeriodFilter {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for PeriodFilter {
  type Err = AppError;

  fn from_str(value: &str) -> Result<Self, Self::Err> {
    match value.trim() {
      "all" | "" => Ok(PeriodFilter::All),
      other => other.parse().map(PeriodFilter::Sub),
    }
  }
}

impl TryFrom<String> for PeriodFilter {
  type Error = AppError;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    value.parse()
  }
}

impl From<PeriodFilter> for String {
  fn from(value: PeriodFilter) -> Self {
    value.as_str().to_string()
  }
}

fn day_of(month: YearMonth, day: u32) -> NaiveDate {
  NaiveDate::from_ymd_opt(month.year, month.month, day).unwrap_or_else(|| month.last_day())
}

/// Half-open [start, end) used by book closing. "16-31" ends on the 1st of the next month.
pub fn closing_bounds(month: YearMonth, sub: SubPeriod) -> (NaiveDate, NaiveDate) {
  match sub {
    SubPeriod::FirstHalf => (month.first_day(), day_of(month, 16)),
    SubPeriod::SecondHalf => (day_of(month, 16), month.next().first_day()),
  }
}

pub fn current_sub_period(today: NaiveDate) -> SubPeriod {
  SubPeriod::for_day(today.day())
}

pub fn is_working_day(date: NaiveDate) -> bool {
  !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

pub fn working_days_between(start: NaiveDate, end: NaiveDate) -> u32 {
  if end < start {
    return 0;
  }
  start
    .iter_days()
    .take_while(|day| *day <= end)
    .filter(|day| is_working_day(*day))
    .count() as u32
}

pub fn elapsed_working_days(start: NaiveDate, end: NaiveDate, today: NaiveDate) -> u32 {
  if today < start {
    return 0;
  }
  working_days_between(start, end.min(today))
}

pub fn trailing_months(current: YearMonth, count: usize) -> Vec<YearMonth> {
  let mut months = Vec::with_capacity(count);
  let mut cursor = current;
  for _ in 0..count {
    months.push(cursor);
    cursor = cursor.prev();
  }
  months.reverse();
  months
}
