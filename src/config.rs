use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::service::normalizer::NormalizerConfig;
use crate::service::similarity::SimilarityMetric;

/// 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub matching: MatchingConfig,
    pub csv: CsvLayout,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// 账簿上传（CSV / xlsx）的请求体上限
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            max_upload_bytes: 20 * 1024 * 1024,
        }
    }
}

/// 匹配参数，请求未指定容差/阈值时使用这里的默认值
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// 金额容差（货币单位）
    pub tolerance: BigDecimal,
    /// 描述相似度阈值，[0, 1]
    pub similarity_threshold: f64,
    pub metric: SimilarityMetric,
    pub parallel: bool,
    pub normalizer: NormalizerConfig,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            tolerance: BigDecimal::new(10.into(), 2),
            similarity_threshold: 0.3,
            metric: SimilarityMetric::default(),
            parallel: false,
            normalizer: NormalizerConfig::default(),
        }
    }
}

/// 账簿导出文件的列布局（0 起始的列位置），CSV 与 xlsx 共用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsvLayout {
    pub has_headers: bool,
    pub delimiter: char,
    pub date_column: usize,
    pub description_column: usize,
    pub debit_column: usize,
    pub credit_column: usize,
}

impl Default for CsvLayout {
    fn default() -> Self {
        // Esercizio, Data_Reg, N_Reg, Sede, Descrizione, Data_Doc, N_Doc, Prot, Dare, Avere, ...
        Self {
            has_headers: true,
            delimiter: ',',
            date_column: 1,
            description_column: 4,
            debit_column: 8,
            credit_column: 9,
        }
    }
}

impl AppConfig {
    /// 加载配置: 默认值 -> reconcile.toml (可选) -> 环境变量 RECON_*
    ///
    /// 环境变量用 `__` 分隔层级，列表用逗号，例如
    /// `RECON_SERVER__PORT=9000`、`RECON_MATCHING__NORMALIZER__NOISE_WORDS=SRL,SPA`。
    pub fn from_env() -> Result<Self, ::config::ConfigError> {
        Self::load(Some("reconcile"))
    }

    pub fn load(file: Option<&str>) -> Result<Self, ::config::ConfigError> {
        let mut builder = ::config::Config::builder()
            .add_source(::config::Config::try_from(&AppConfig::default())?);

        if let Some(file) = file {
            builder = builder.add_source(::config::File::with_name(file).required(false));
        }

        builder
            .add_source(
                ::config::Environment::with_prefix("RECON")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("matching.normalizer.noise_words")
                    .with_list_parse_key("matching.normalizer.prefixes"),
            )
            .build()?
            .try_deserialize()
    }
}
