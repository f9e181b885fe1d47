use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 原始金额单元格：可能已是数字，也可能是带货币符号、千分位的文本
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawAmount {
    Number(f64),
    Text(String),
}

impl From<&str> for RawAmount {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<f64> for RawAmount {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

/// 账簿记录 (输入，读取后不可变)
///
/// `id` 为导入时分配的批次内位置序号。借方/贷方金额在合法行中最多一个非零。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: usize,
    pub date: NaiveDate,
    pub description: String,
    pub debit: BigDecimal, // Dare
    pub credit: BigDecimal, // Avere
}

impl LedgerEntry {
    pub fn new(
        id: usize,
        date: NaiveDate,
        description: impl Into<String>,
        debit: BigDecimal,
        credit: BigDecimal,
    ) -> Self {
        Self {
            id,
            date,
            description: description.into(),
            debit,
            credit,
        }
    }
}

/// 归一化后的记录，仅在一次对账调用内存在
#[derive(Debug, Clone)]
pub struct NormalizedEntry<'a> {
    pub entry: &'a LedgerEntry,
    /// 身份标记，只用于相似度比较，不用于展示
    pub identity: String,
}
