use bigdecimal::BigDecimal;
use thiserror::Error;

/// 对账错误：只有结构性错误才会向外抛出
///
/// 金额无法解析、描述为空等单行问题在本地降级处理（0 / "N/D"），不会出现在这里。
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// 行缺少必填字段
    #[error("row {row}: missing required field '{field}'")]
    MissingField { row: usize, field: &'static str },

    /// 日期无法解析
    #[error("row {row}: cannot parse date '{value}'")]
    DateParse { row: usize, value: String },

    /// 同一批次中的记录ID重复
    #[error("duplicate entry id {0}")]
    DuplicateId(usize),

    /// 借方与贷方金额同时非零
    #[error("entry {id}: debit {debit} and credit {credit} are both non-zero")]
    ConflictingAmounts {
        id: usize,
        debit: BigDecimal,
        credit: BigDecimal,
    },

    #[error("tolerance must be non-negative, got {0}")]
    InvalidTolerance(BigDecimal),

    #[error("similarity threshold must lie in [0, 1], got {0}")]
    InvalidThreshold(f64),

    /// 归一化配置中的正则无法编译
    #[error("invalid normalizer pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("xlsx error: {0}")]
    Workbook(#[from] calamine::XlsxError),

    #[error("workbook contains no sheets")]
    EmptyWorkbook,

    /// 生成 Excel 报表失败
    #[error("xlsx export error: {0}")]
    Export(#[from] rust_xlsxwriter::XlsxError),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReconcileError {
    /// 是否由调用方输入引起（对应 HTTP 400）
    pub fn is_input_error(&self) -> bool {
        !matches!(self, Self::Pattern { .. } | Self::Export(_) | Self::Io(_))
    }
}
