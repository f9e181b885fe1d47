use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ReconcileError;

/// 无法确定身份时的占位标记
pub const UNRESOLVED_IDENTITY: &str = "N/D";

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("static pattern"));

static DEFAULT_NORMALIZER: LazyLock<NameNormalizer> = LazyLock::new(|| {
    NameNormalizer::new(&NormalizerConfig::default()).expect("default normalizer patterns")
});

/// 描述归一化配置
///
/// `prefixes` 是正则片段，只在开头匹配且忽略大小写；`noise_words` 是字面词，按词边界整词删除。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizerConfig {
    pub prefixes: Vec<String>,
    pub noise_words: Vec<String>,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            prefixes: vec![r"(BDS-\s*)?BON VITTORIA SIN\s*".to_string()],
            noise_words: [
                "SNC",
                "SAS",
                "SRL",
                "SPA",
                "DI",
                "&",
                "C",
                "ESTINTORI",
                "TRAPUNTIFICIO",
                "ARREDAMENT",
            ]
            .iter()
            .map(|w| w.to_string())
            .collect(),
        }
    }
}

/// 描述归一化器：把自由文本描述变成用于相似度比较的身份标记
#[derive(Debug, Clone)]
pub struct NameNormalizer {
    prefixes: Vec<Regex>,
    noise_words: Vec<Regex>,
}

impl NameNormalizer {
    pub fn new(config: &NormalizerConfig) -> Result<Self, ReconcileError> {
        let prefixes = config
            .prefixes
            .iter()
            .map(|p| compile(&format!("^(?i:{})", p), p))
            .collect::<Result<Vec<_>, _>>()?;

        let noise_words = config
            .noise_words
            .iter()
            .filter(|w| !w.trim().is_empty())
            .map(|w| {
                compile(
                    &format!(r"\b{}\b", regex::escape(&w.trim().to_uppercase())),
                    w,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            prefixes,
            noise_words,
        })
    }

    /// 归一化描述
    ///
    /// 转大写后依次 去前缀、去噪音词、压缩空白。单轮结果可能再次以前缀开头
    /// （如 `" BON VITTORIA SIN X"` 压缩空白之后），所以这一轮会反复执行直到结果稳定，
    /// 保证 `normalize(normalize(x)) == normalize(x)`。
    pub fn normalize(&self, description: &str) -> String {
        let mut current = description.to_uppercase();

        loop {
            let next = self.strip_once(&current);
            if next == current {
                break;
            }
            current = next;
        }

        if current.is_empty() {
            UNRESOLVED_IDENTITY.to_string()
        } else {
            current
        }
    }

    fn strip_once(&self, input: &str) -> String {
        let mut name = input.to_string();
        for prefix in &self.prefixes {
            name = prefix.replace(&name, "").into_owned();
        }
        for word in &self.noise_words {
            name = word.replace_all(&name, "").into_owned();
        }
        WHITESPACE_RE.replace_all(&name, " ").trim().to_string()
    }
}

impl Default for NameNormalizer {
    fn default() -> Self {
        DEFAULT_NORMALIZER.clone()
    }
}

/// 使用默认配置归一化描述
pub fn normalize_identity(description: &str) -> String {
    DEFAULT_NORMALIZER.normalize(description)
}

fn compile(pattern: &str, source: &str) -> Result<Regex, ReconcileError> {
    Regex::new(pattern).map_err(|e| ReconcileError::Pattern {
        pattern: source.to_string(),
        source: e,
    })
}
