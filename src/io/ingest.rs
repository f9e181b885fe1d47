use chrono::NaiveDate;

use crate::config::CsvLayout;
use crate::error::ReconcileError;
use crate::models::{LedgerEntry, RawAmount};
use crate::service::amount::parse_amount;

const DATE_FORMATS: [&str; 4] = ["%d/%m/%Y", "%Y-%m-%d", "%d-%m-%Y", "%d.%m.%Y"];

/// 单元格中的登记日期：文本待解析，或电子表格中已经是日期
#[derive(Debug, Clone, PartialEq)]
pub enum DateCell {
    Text(String),
    Date(NaiveDate),
}

/// 一行中按列位置取出的四个字段，`None` 表示该列不存在
#[derive(Debug, Clone, Default)]
pub struct RowCells {
    pub date: Option<DateCell>,
    pub description: Option<String>,
    pub debit: Option<RawAmount>,
    pub credit: Option<RawAmount>,
}

impl RowCells {
    /// 缺列、日期为空为结构性错误；金额与描述按宽松规则降级
    pub fn into_entry(self, id: usize, row: usize) -> Result<LedgerEntry, ReconcileError> {
        let missing = |field| ReconcileError::MissingField { row, field };

        let date = match self.date.ok_or_else(|| missing("date"))? {
            DateCell::Date(date) => date,
            DateCell::Text(text) => {
                let text = text.trim();
                if text.is_empty() {
                    return Err(missing("date"));
                }
                parse_date(text).ok_or_else(|| ReconcileError::DateParse {
                    row,
                    value: text.to_string(),
                })?
            }
        };
        let description = self.description.ok_or_else(|| missing("description"))?;
        let debit = parse_amount(&self.debit.ok_or_else(|| missing("debit"))?);
        let credit = parse_amount(&self.credit.ok_or_else(|| missing("credit"))?);

        Ok(LedgerEntry::new(id, date, description.trim(), debit, credit))
    }
}

/// 读取账簿导出 CSV
///
/// 按列位置取 登记日期/描述/借方/贷方，其余列忽略。记录ID为数据行的位置序号；
/// 只有分隔符的空白行同样占一个序号，并因日期为空而报错。
pub fn load_ledger_csv<R: std::io::Read>(
    reader: R,
    layout: &CsvLayout,
) -> Result<Vec<LedgerEntry>, ReconcileError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(layout.has_headers)
        .delimiter(delimiter_byte(layout.delimiter))
        .flexible(true)
        .from_reader(reader);

    let mut entries = Vec::new();
    for (id, record) in rdr.records().enumerate() {
        let record = record?;
        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(id + 1);

        let text = |column: usize| record.get(column).map(str::to_string);
        let cells = RowCells {
            date: text(layout.date_column).map(DateCell::Text),
            description: text(layout.description_column),
            debit: text(layout.debit_column).map(RawAmount::Text),
            credit: text(layout.credit_column).map(RawAmount::Text),
        };
        entries.push(cells.into_entry(id, line)?);
    }

    tracing::info!("读取账簿记录 {} 条", entries.len());
    Ok(entries)
}

/// 解析登记日期，允许带时间部分（如电子表格导出的 "2024-01-31 00:00:00"）
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let date_part = value
        .trim()
        .split(|c: char| c == ' ' || c == 'T')
        .next()
        .unwrap_or_default();

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
}

fn delimiter_byte(delimiter: char) -> u8 {
    if delimiter.is_ascii() {
        delimiter as u8
    } else {
        tracing::warn!("non-ascii csv delimiter '{}', falling back to ','", delimiter);
        b','
    }
}
