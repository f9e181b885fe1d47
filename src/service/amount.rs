use std::str::FromStr;
use std::sync::LazyLock;

use bigdecimal::{BigDecimal, Zero};
use regex::Regex;

use crate::models::RawAmount;

/// 字母、空白、千分位点号、货币符号
static STRIP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z\s.\p{Sc}]").expect("static pattern"));

static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)$").expect("static pattern"));

/// 将金额单元格转换为带符号的十进制数
///
/// 解析永不失败：空串或无法解析的文本一律视为 0，避免单个坏单元格中断整批对账。
pub fn parse_amount(raw: &RawAmount) -> BigDecimal {
    match raw {
        RawAmount::Number(n) => decimal_from_f64(*n).unwrap_or_else(BigDecimal::zero),
        RawAmount::Text(s) => parse_amount_text(s),
    }
}

/// 文本金额: "€ 1.234,56" -> 1234.56
pub fn parse_amount_text(text: &str) -> BigDecimal {
    let cleaned = STRIP_RE.replace_all(text, "").replace(',', ".");
    if cleaned.is_empty() || !NUMBER_RE.is_match(&cleaned) {
        if !cleaned.is_empty() {
            tracing::trace!("unparseable amount '{}', using 0", text);
        }
        return BigDecimal::zero();
    }

    // BigDecimal 不接受 ".5" 这种写法
    let digits = match cleaned.find('.') {
        Some(0) => format!("0{}", cleaned),
        Some(1) if cleaned.starts_with(|c| c == '+' || c == '-') => {
            format!("{}0{}", &cleaned[..1], &cleaned[1..])
        }
        _ => cleaned,
    };

    BigDecimal::from_str(digits.trim_end_matches('.')).unwrap_or_else(|_| BigDecimal::zero())
}

/// 数字转十进制；NaN/无穷返回 None
pub fn decimal_from_f64(n: f64) -> Option<BigDecimal> {
    if !n.is_finite() {
        return None;
    }
    // f64 的 Display 是最短可回读形式，且不会使用指数表示
    BigDecimal::from_str(&n.to_string()).ok()
}
