pub mod export;
pub mod ingest;
pub mod xlsx;

pub use export::{write_pairs_csv, write_residue_csv};
pub use ingest::{load_ledger_csv, parse_date, DateCell, RowCells};
pub use xlsx::{load_ledger_xlsx, write_pairs_xlsx, write_residue_xlsx};

use crate::config::CsvLayout;
use crate::error::ReconcileError;
use crate::models::LedgerEntry;

/// 账簿上传与报表下载支持的表格格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFormat {
    Csv,
    Xlsx,
}

impl SheetFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Xlsx => "xlsx",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Csv => "text/csv; charset=utf-8",
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        }
    }
}

/// 按格式读取上传的账簿文件
pub fn load_ledger(
    format: SheetFormat,
    bytes: &[u8],
    layout: &CsvLayout,
) -> Result<Vec<LedgerEntry>, ReconcileError> {
    match format {
        SheetFormat::Csv => load_ledger_csv(bytes, layout),
        SheetFormat::Xlsx => load_ledger_xlsx(std::io::Cursor::new(bytes), layout),
    }
}
