use std::collections::BTreeMap;
use std::path::Path;

use chrono::{Datelike, NaiveDate};
use rust_xlsxwriter::{Color, ExcelDateTime, Format, FormatAlign, Workbook, Worksheet};

use crate::domain::dates::Dated;
use crate::error::AppError;
use crate::models::{ClosedPeriod, Order};

pub fn export_workbook(
  ledger: &[ClosedPeriod],
  open_orders: &[Order],
  path: &Path,
  currency: &str,
  today: NaiveDate,
) -> Result<(), AppError> {
  let mut workbook = Workbook::new();
  let money = Format::new().set_num_format(format!("[${currency}] #,##0"));
  write_ledger_sheet(&mut workbook, ledger, &money)?;
  write_orders_sheet(&mut workbook, open_orders, &money, today)?;
  workbook
    .save(path)
    .map_err(|err| AppError::new("EXPORT", err.to_string()))?;
  Ok(())
}

fn header_format() -> Format {
  Format::new()
    .set_bold()
    .set_background_color(Color::RGB(0xE2E8F0))
    .set_align(FormatAlign::Center)
}

fn write_ledger_sheet(workbook: &mut Workbook, ledger: &[ClosedPeriod], money: &Format) -> Result<(), AppError> {
  let sheet = workbook.add_worksheet();
  sheet
    .set_name("BUKU")
    .map_err(|err| AppError::new("EXPORT", err.to_string()))?;

  let title = Format::new()
    .set_bold()
    .set_font_color(Color::White)
    .set_background_color(Color::RGB(0x1A2433));
  let header = header_format();
  let date_format = Format::new().set_num_format("dd.mm.yyyy");

  sheet.merge_range(0, 0, 0, 10, "Riwayat Tutup Buku", &title)?;

  let headers = [
    "Periode",
    "Sub",
    "Mulai",
    "Sampai",
    "Order",
    "Qty klik",
    "Qty paket",
    "Total Qty",
    "Nominal klik",
    "Nominal paket",
    "Total Nominal",
  ];
  for (idx, label) in headers.iter().enumerate() {
    sheet.write_string_with_format(2, idx as u16, *label, &header)?;
  }

  let mut row = 3;
  for entry in ledger {
    sheet.write_string(row, 0, &entry.year_month)?;
    sheet.write_string(row, 1, entry.sub_period.as_str())?;
    write_date(sheet, row, 2, entry.start_date, &date_format)?;
    // stored end is exclusive
    write_date(sheet, row, 3, entry.end_date.pred_opt().unwrap_or(entry.end_date), &date_format)?;
    sheet.write_number(row, 4, entry.total_orders as f64)?;
    sheet.write_number(row, 5, label_value(&entry.qty_by_label, "klik"))?;
    sheet.write_number(row, 6, label_value(&entry.qty_by_label, "paket"))?;
    sheet.write_number(row, 7, entry.total_qty)?;
    sheet.write_number_with_format(row, 8, label_value(&entry.nominal_by_label, "klik"), money)?;
    sheet.write_number_with_format(row, 9, label_value(&entry.nominal_by_label, "paket"), money)?;
    sheet.write_number_with_format(row, 10, entry.total_nominal, money)?;
    row += 1;
  }

  sheet.set_column_width(0, 12)?;
  sheet.set_column_width(1, 8)?;
  sheet.set_column_width(2, 12)?;
  sheet.set_column_width(3, 12)?;
  for col in 4..=10 {
    sheet.set_column_width(col, 14)?;
  }
  if row > 3 {
    sheet.autofilter(2, 0, row - 1, 10)?;
  }
  sheet.set_freeze_panes(3, 0)?;
  Ok(())
}

fn write_orders_sheet(
  workbook: &mut Workbook,
  orders: &[Order],
  money: &Format,
  today: NaiveDate,
) -> Result<(), AppError> {
  let sheet = workbook.add_worksheet();
  sheet
    .set_name("ORDER")
    .map_err(|err| AppError::new("EXPORT", err.to_string()))?;

  let title = Format::new().set_bold().set_font_size(14.0);
  let header = header_format();
  let date_format = Format::new().set_num_format("dd.mm.yyyy");

  sheet.write_string_with_format(0, 0, "Order terbuka", &title)?;

  let headers = ["ID", "Tanggal", "Label", "Qty", "Tarif", "Total", "Catatan"];
  for (idx, label) in headers.iter().enumerate() {
    sheet.write_string_with_format(2, idx as u16, *label, &header)?;
  }

  let mut row = 3;
  for order in orders {
    sheet.write_number(row, 0, order.id as f64)?;
    write_date(sheet, row, 1, order.resolved_date(today), &date_format)?;
    sheet.write_string(row, 2, order.label.as_str())?;
    sheet.write_number(row, 3, order.quantity)?;
    sheet.write_number_with_format(row, 4, order.unit_rate, money)?;
    sheet.write_number_with_format(row, 5, order.total, money)?;
    sheet.write_string(row, 6, &order.note)?;
    row += 1;
  }

  sheet.set_column_width(0, 8)?;
  sheet.set_column_width(1, 12)?;
  sheet.set_column_width(2, 10)?;
  sheet.set_column_width(3, 8)?;
  sheet.set_column_width(4, 14)?;
  sheet.set_column_width(5, 14)?;
  sheet.set_column_width(6, 30)?;
  if row > 3 {
    sheet.autofilter(2, 0, row - 1, 6)?;
  }
  sheet.set_freeze_panes(3, 0)?;
  Ok(())
}

fn label_value(map: &BTreeMap<String, f64>, key: &str) -> f64 {
  map.get(key).copied().unwrap_or(0.0)
}

fn write_date(sheet: &mut Worksheet, row: u32, col: u16, date: NaiveDate, format: &Format) -> Result<(), AppError> {
  let year = u16::try_from(date.year()).map_err(|_| AppError::new("INVALID_DATE", "Tanggal tidak valid"))?;
  let date = ExcelDateTime::from_ymd(year, date.month() as u8, date.day() as u8)
    .map_err(|err| AppError::new("EXPORT", err.to_string()))?;
  sheet.write_datetime_with_format(row, col, &date, format)?;
  Ok(())
}
