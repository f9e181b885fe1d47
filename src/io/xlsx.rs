use std::io::{Read, Seek};

use bigdecimal::{BigDecimal, ToPrimitive};
use calamine::{Data, Reader, Xlsx};
use chrono::{Datelike, Days, NaiveDate};
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook, Worksheet};

use super::export::{PAIR_HEADERS, RESIDUE_HEADERS};
use super::ingest::{DateCell, RowCells};
use crate::config::CsvLayout;
use crate::error::ReconcileError;
use crate::models::{LedgerEntry, RawAmount, ReconciledPair};

const REPORT_SHEET: &str = "Report";

/// 读取 Excel 账簿（第一个工作表）
///
/// 列位置与 CSV 相同。首个非空行视为表头（`has_headers` 为真时）；
/// 数字金额直接取值，日期单元格按 1900 日期系统换算。
pub fn load_ledger_xlsx<RS: Read + Seek>(
    reader: RS,
    layout: &CsvLayout,
) -> Result<Vec<LedgerEntry>, ReconcileError> {
    let mut workbook: Xlsx<RS> = Xlsx::new(reader)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(ReconcileError::EmptyWorkbook)??;

    let (Some((first_row, _)), Some((last_row, last_col))) = (range.start(), range.end()) else {
        tracing::info!("工作表为空");
        return Ok(Vec::new());
    };

    // 超出工作表宽度的列视为不存在；范围内的空单元格为 Empty
    let cell = |row: u32, column: usize| -> Option<Data> {
        let column = u32::try_from(column).ok().filter(|c| *c <= last_col)?;
        Some(range.get_value((row, column)).cloned().unwrap_or(Data::Empty))
    };

    let data_start = first_row + u32::from(layout.has_headers);
    let mut entries = Vec::new();
    for (id, row) in (data_start..=last_row).enumerate() {
        let cells = RowCells {
            date: cell(row, layout.date_column).map(date_cell),
            description: cell(row, layout.description_column).map(text_cell),
            debit: cell(row, layout.debit_column).map(amount_cell),
            credit: cell(row, layout.credit_column).map(amount_cell),
        };
        entries.push(cells.into_entry(id, row as usize + 1)?);
    }

    tracing::info!("读取 Excel 账簿记录 {} 条", entries.len());
    Ok(entries)
}

fn date_cell(data: Data) -> DateCell {
    let serial = match data {
        Data::DateTime(dt) => dt.as_f64(),
        Data::Float(n) => n,
        Data::Int(n) => n as f64,
        Data::Empty => return DateCell::Text(String::new()),
        Data::String(s) | Data::DateTimeIso(s) => return DateCell::Text(s),
        other => return DateCell::Text(other.to_string()),
    };
    match serial_date(serial) {
        Some(date) => DateCell::Date(date),
        None => DateCell::Text(serial.to_string()),
    }
}

fn text_cell(data: Data) -> String {
    match data {
        Data::Empty => String::new(),
        Data::String(s) => s,
        other => other.to_string(),
    }
}

fn amount_cell(data: Data) -> RawAmount {
    match data {
        Data::Float(n) => RawAmount::Number(n),
        Data::Int(n) => RawAmount::Number(n as f64),
        Data::String(s) => RawAmount::Text(s),
        Data::Empty => RawAmount::Text(String::new()),
        other => RawAmount::Text(other.to_string()),
    }
}

/// Excel 序列号 -> 日期，时间部分舍去
fn serial_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_days(Days::new(serial.trunc() as u64))
}

/// 报表单元格格式
struct ReportFormats {
    header: Format,
    date: Format,
    money: Format,
    ratio: Format,
}

impl ReportFormats {
    fn new() -> Self {
        Self {
            header: Format::new().set_bold(),
            date: Format::new().set_num_format("yyyy-mm-dd"),
            money: Format::new().set_num_format("0.00"),
            ratio: Format::new().set_num_format("0.0000"),
        }
    }

    fn write_header(&self, sheet: &mut Worksheet, headers: &[&str]) -> Result<(), ReconcileError> {
        for (col, title) in headers.iter().enumerate() {
            sheet.write_string_with_format(0, col as u16, *title, &self.header)?;
        }
        Ok(())
    }

    fn write_date(
        &self,
        sheet: &mut Worksheet,
        row: u32,
        col: u16,
        date: NaiveDate,
    ) -> Result<(), ReconcileError> {
        let value = ExcelDateTime::from_ymd(date.year() as u16, date.month() as u8, date.day() as u8)?;
        sheet.write_datetime_with_format(row, col, &value, &self.date)?;
        Ok(())
    }

    fn write_money(
        &self,
        sheet: &mut Worksheet,
        row: u32,
        col: u16,
        value: &BigDecimal,
    ) -> Result<(), ReconcileError> {
        let number = value.round(2).to_f64().unwrap_or_default();
        sheet.write_number_with_format(row, col, number, &self.money)?;
        Ok(())
    }
}

/// 配对报表（.xlsx）
pub fn write_pairs_xlsx(pairs: &[ReconciledPair]) -> Result<Vec<u8>, ReconcileError> {
    let formats = ReportFormats::new();
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet().set_name(REPORT_SHEET)?;
    formats.write_header(sheet, &PAIR_HEADERS)?;

    for (i, pair) in pairs.iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write_number(row, 0, pair.debit_id as f64)?;
        formats.write_date(sheet, row, 1, pair.debit_date)?;
        sheet.write_string(row, 2, &pair.debit_description)?;
        formats.write_money(sheet, row, 3, &pair.debit_amount)?;
        sheet.write_number(row, 4, pair.credit_id as f64)?;
        formats.write_date(sheet, row, 5, pair.credit_date)?;
        sheet.write_string(row, 6, &pair.credit_description)?;
        formats.write_money(sheet, row, 7, &pair.credit_amount)?;
        formats.write_money(sheet, row, 8, &pair.difference)?;
        sheet.write_number_with_format(row, 9, pair.similarity, &formats.ratio)?;
    }
    sheet.autofit();

    Ok(workbook.save_to_buffer()?)
}

/// 残余记录报表（.xlsx）
pub fn write_residue_xlsx(residue: &[LedgerEntry]) -> Result<Vec<u8>, ReconcileError> {
    let formats = ReportFormats::new();
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet().set_name(REPORT_SHEET)?;
    formats.write_header(sheet, &RESIDUE_HEADERS)?;

    for (i, entry) in residue.iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write_number(row, 0, entry.id as f64)?;
        formats.write_date(sheet, row, 1, entry.date)?;
        sheet.write_string(row, 2, &entry.description)?;
        formats.write_money(sheet, row, 3, &entry.debit)?;
        formats.write_money(sheet, row, 4, &entry.credit)?;
    }
    sheet.autofit();

    Ok(workbook.save_to_buffer()?)
}
