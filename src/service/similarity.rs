use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::normalizer::UNRESOLVED_IDENTITY;

/// 身份标记相似度算法，结果均在 [0, 1]，相同输入为 1.0
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMetric {
    /// Ratcliff/Obershelp 匹配块比率 2·M / (|a| + |b|)
    #[default]
    SequenceRatio,
    /// 归一化 Levenshtein 距离
    Levenshtein,
    JaroWinkler,
}

impl SimilarityMetric {
    /// 原始字符串相似度（不处理 "N/D"），参数顺序不影响结果
    pub fn score(&self, a: &str, b: &str) -> f64 {
        let (a, b) = if a <= b { (a, b) } else { (b, a) };
        let raw = match self {
            Self::SequenceRatio => sequence_ratio(a, b),
            Self::Levenshtein => strsim::normalized_levenshtein(a, b),
            Self::JaroWinkler => strsim::jaro_winkler(a, b),
        };
        raw.clamp(0.0, 1.0)
    }
}

/// 两个身份标记的相似度；任一方为 "N/D" 时强制为 0.0
pub fn identity_similarity(metric: SimilarityMetric, a: &str, b: &str) -> f64 {
    if a == UNRESOLVED_IDENTITY || b == UNRESOLVED_IDENTITY {
        return 0.0;
    }
    metric.score(a, b)
}

/// Ratcliff/Obershelp 比率
///
/// 该算法按参数顺序可能给出不同结果，这里先按字典序排好两个参数以保证对称。
pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    let (a, b) = if a <= b { (a, b) } else { (b, a) };
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    2.0 * matching_chars(&a, &b) as f64 / total as f64
}

/// 所有匹配块长度之和
fn matching_chars(a: &[char], b: &[char]) -> usize {
    let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
    for (j, c) in b.iter().enumerate() {
        b2j.entry(*c).or_default().push(j);
    }

    let mut matched = 0;
    let mut queue = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = queue.pop() {
        let (i, j, k) = longest_match(a, &b2j, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        matched += k;
        if alo < i && blo < j {
            queue.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            queue.push((i + k, ahi, j + k, bhi));
        }
    }
    matched
}

/// a[alo..ahi] 与 b[blo..bhi] 的最长公共子串 (i, j, 长度)，并列时取最靠前者
fn longest_match(
    a: &[char],
    b2j: &HashMap<char, Vec<usize>>,
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let mut best = (alo, blo, 0);
    let mut j2len: HashMap<usize, usize> = HashMap::new();

    for (i, c) in a.iter().enumerate().take(ahi).skip(alo) {
        let mut next: HashMap<usize, usize> = HashMap::new();
        if let Some(positions) = b2j.get(c) {
            for &j in positions {
                if j < blo {
                    continue;
                }
                if j >= bhi {
                    break;
                }
                let k = if j > 0 {
                    j2len.get(&(j - 1)).copied().unwrap_or(0) + 1
                } else {
                    1
                };
                next.insert(j, k);
                if k > best.2 {
                    best = (i + 1 - k, j + 1 - k, k);
                }
            }
        }
        j2len = next;
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    const METRICS: [SimilarityMetric; 3] = [
        SimilarityMetric::SequenceRatio,
        SimilarityMetric::Levenshtein,
        SimilarityMetric::JaroWinkler,
    ];

    #[test]
    fn sequence_ratio_known_values() {
        assert_eq!(sequence_ratio("ROSSI", "ROSSI"), 1.0);
        assert_eq!(sequence_ratio("", ""), 1.0);
        assert_eq!(sequence_ratio("ABC", ""), 0.0);
        assert_eq!(sequence_ratio("ABCD", "XYZ"), 0.0);
        // "PAGAMENTO ROSSI" vs "ROSSI": 2*5 / 20
        assert!((sequence_ratio("PAGAMENTO ROSSI", "ROSSI") - 0.5).abs() < 1e-12);
        // "abcd" vs "bcde": "bcd" -> 2*3 / 8
        assert!((sequence_ratio("abcd", "bcde") - 0.75).abs() < 1e-12);
    }

    #[test]
    fn swapped_words_keep_one_block() {
        // 词序颠倒时只能取到一个匹配块: 2*5 / 22
        let r = sequence_ratio("ROSSI MARIO", "MARIO ROSSI");
        assert!((r - 10.0 / 22.0).abs() < 1e-12, "{r}");
    }

    #[test]
    fn all_metrics_are_symmetric_and_bounded() {
        let pairs = [
            ("PAGAMENTO ROSSI", "ROSSI"),
            ("BIANCHI", "ROSSI"),
            ("ABAB", "BABA"),
            ("VERDI LUCA", "LUCA VERDI"),
            ("", "X"),
        ];
        for metric in METRICS {
            for (a, b) in pairs {
                let ab = metric.score(a, b);
                let ba = metric.score(b, a);
                assert_eq!(ab, ba, "{metric:?} {a:?} {b:?}");
                assert!((0.0..=1.0).contains(&ab));
            }
            assert_eq!(metric.score("ROSSI", "ROSSI"), 1.0);
        }
    }

    #[test]
    fn unresolved_identity_never_scores() {
        for metric in METRICS {
            assert_eq!(identity_similarity(metric, "N/D", "N/D"), 0.0);
            assert_eq!(identity_similarity(metric, "ROSSI", "N/D"), 0.0);
            assert_eq!(identity_similarity(metric, "N/D", "ROSSI"), 0.0);
        }
    }
}
