use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::LedgerEntry;

/// 对账结果行：一条借方与一条贷方的配对
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciledPair {
    pub debit_id: usize,
    pub debit_date: NaiveDate,
    pub debit_description: String,
    pub debit_amount: BigDecimal,
    pub credit_id: usize,
    pub credit_date: NaiveDate,
    pub credit_description: String,
    pub credit_amount: BigDecimal,
    /// |借方 - 贷方|
    pub difference: BigDecimal,
    pub similarity: f64,
}

/// 对账统计信息
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconcileStats {
    pub total_entries: usize,
    pub debit_entries: usize,
    pub credit_entries: usize,
    pub matched_pairs: usize,
    pub residue_entries: usize,
    pub matched_debit_total: BigDecimal,
    pub matched_credit_total: BigDecimal,
}

/// 一次对账的完整输出：配对 + 残余（按输入顺序）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reconciliation {
    pub pairs: Vec<ReconciledPair>,
    pub residue: Vec<LedgerEntry>,
    pub stats: ReconcileStats,
}
