use bigdecimal::BigDecimal;

use crate::error::ReconcileError;
use crate::models::{LedgerEntry, ReconciledPair};

pub(crate) const PAIR_HEADERS: [&str; 10] = [
    "debit_id",
    "debit_date",
    "debit_description",
    "debit_amount",
    "credit_id",
    "credit_date",
    "credit_description",
    "credit_amount",
    "difference",
    "similarity",
];

pub(crate) const RESIDUE_HEADERS: [&str; 5] = ["id", "date", "description", "debit", "credit"];

/// 金额保留两位小数
fn money(value: &BigDecimal) -> String {
    value.round(2).with_scale(2).to_string()
}

/// 导出配对报表
pub fn write_pairs_csv<W: std::io::Write>(
    writer: W,
    pairs: &[ReconciledPair],
) -> Result<(), ReconcileError> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(PAIR_HEADERS)?;

    for pair in pairs {
        writer.write_record(&[
            pair.debit_id.to_string(),
            pair.debit_date.to_string(),
            pair.debit_description.clone(),
            money(&pair.debit_amount),
            pair.credit_id.to_string(),
            pair.credit_date.to_string(),
            pair.credit_description.clone(),
            money(&pair.credit_amount),
            money(&pair.difference),
            format!("{:.4}", pair.similarity),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// 导出残余（未配对）记录报表
pub fn write_residue_csv<W: std::io::Write>(
    writer: W,
    residue: &[LedgerEntry],
) -> Result<(), ReconcileError> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(RESIDUE_HEADERS)?;

    for entry in residue {
        writer.write_record(&[
            entry.id.to_string(),
            entry.date.to_string(),
            entry.description.clone(),
            money(&entry.debit),
            money(&entry.credit),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::Zero;
    use chrono::NaiveDate;
    use std::str::FromStr;

    #[test]
    fn pairs_report_layout() {
        let date = NaiveDate::from_ymd_opt(2024, 4, 30).unwrap();
        let pair = ReconciledPair {
            debit_id: 0,
            debit_date: date,
            debit_description: "PAGAMENTO, ROSSI".into(),
            debit_amount: BigDecimal::from(100),
            credit_id: 3,
            credit_date: date,
            credit_description: "ROSSI SRL".into(),
            credit_amount: BigDecimal::from_str("100.054").unwrap(),
            difference: BigDecimal::from_str("0.054").unwrap(),
            similarity: 0.5,
        };

        let mut out = Vec::new();
        write_pairs_csv(&mut out, &[pair]).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], PAIR_HEADERS.join(","));
        assert_eq!(
            lines[1],
            "0,2024-04-30,\"PAGAMENTO, ROSSI\",100.00,3,2024-04-30,ROSSI SRL,100.05,0.05,0.5000"
        );
    }

    #[test]
    fn empty_residue_still_has_headers() {
        let mut out = Vec::new();
        write_residue_csv(&mut out, &[]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "id,date,description,debit,credit\n");

        let mut out = Vec::new();
        let entry = LedgerEntry::new(
            7,
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            "NERI",
            BigDecimal::zero(),
            BigDecimal::from_str("12.5").unwrap(),
        );
        write_residue_csv(&mut out, &[entry]).unwrap();
        assert!(String::from_utf8(out).unwrap().ends_with("7,2024-01-02,NERI,0.00,12.50\n"));
    }
}
