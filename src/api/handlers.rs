use std::str::FromStr;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Json, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::config::{CsvLayout, MatchingConfig};
use crate::error::ReconcileError;
use crate::io::{self, DateCell, RowCells, SheetFormat};
use crate::models::{LedgerEntry, RawAmount, Reconciliation};
use crate::service::amount::decimal_from_f64;
use crate::service::Reconciler;

/// 共享状态：对账服务 + 默认参数
#[derive(Clone)]
pub struct AppState {
    pub reconciler: Arc<Reconciler>,
    pub defaults: Arc<MatchingConfig>,
    pub layout: Arc<CsvLayout>,
}

impl AppState {
    pub fn new(reconciler: Reconciler, defaults: MatchingConfig, layout: CsvLayout) -> Self {
        Self {
            reconciler: Arc::new(reconciler),
            defaults: Arc::new(defaults),
            layout: Arc::new(layout),
        }
    }
}

/// 请求中的单行账簿记录，ID 按数组位置分配
///
/// 四个字段都必须出现；外层 `None` 表示字段缺失，`Some(None)` 表示显式 null。
#[derive(Debug, Deserialize)]
pub struct EntryInput {
    #[serde(default, deserialize_with = "present")]
    pub date: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub debit: Option<Option<RawAmount>>,
    #[serde(default, deserialize_with = "present")]
    pub credit: Option<Option<RawAmount>>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// 请求体: 账簿记录 + 可选参数
#[derive(Debug, Deserialize)]
pub struct ReconcileRequest {
    pub entries: Vec<EntryInput>,
    #[serde(default)]
    pub tolerance: Option<RawAmount>,
    #[serde(default)]
    pub similarity_threshold: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    #[default]
    Pairs,
    Residue,
}

impl ReportKind {
    fn file_stem(self) -> &'static str {
        match self {
            Self::Pairs => "report_riconciliati",
            Self::Residue => "report_residui",
        }
    }
}

/// 文件上传接口的查询参数
#[derive(Debug, Default, Deserialize)]
pub struct ReconcileParams {
    pub tolerance: Option<String>,
    pub similarity_threshold: Option<f64>,
    #[serde(default)]
    pub report: ReportKind,
}

/// 响应体
#[derive(Debug, Serialize)]
pub struct ReconcileResponse {
    pub success: bool,
    pub message: String,
    pub result: Option<Reconciliation>,
}

/// 健康检查
pub async fn health_check() -> &'static str {
    "OK"
}

/// JSON 对账接口
pub async fn reconcile_json(
    State(state): State<AppState>,
    Json(req): Json<ReconcileRequest>,
) -> Response {
    let tolerance = match req.tolerance.as_ref().map(strict_decimal) {
        None => state.defaults.tolerance.clone(),
        Some(Some(t)) => t,
        Some(None) => return failure(StatusCode::BAD_REQUEST, "invalid tolerance".to_string()),
    };
    let threshold = req
        .similarity_threshold
        .unwrap_or(state.defaults.similarity_threshold);

    let entries = match entries_from_request(req.entries) {
        Ok(entries) => entries,
        Err(e) => return error_response(e),
    };

    respond(run(&state, entries, tolerance, threshold).await)
}

/// CSV 对账接口：请求体为账簿导出文件
pub async fn reconcile_csv(
    State(state): State<AppState>,
    Query(params): Query<ReconcileParams>,
    body: Bytes,
) -> Response {
    respond(reconcile_upload(&state, &params, SheetFormat::Csv, &body).await)
}

/// Excel 对账接口：请求体为 .xlsx 账簿
pub async fn reconcile_xlsx(
    State(state): State<AppState>,
    Query(params): Query<ReconcileParams>,
    body: Bytes,
) -> Response {
    respond(reconcile_upload(&state, &params, SheetFormat::Xlsx, &body).await)
}

/// CSV 对账并直接下载 CSV 报表（配对或残余）
pub async fn export_csv(
    State(state): State<AppState>,
    Query(params): Query<ReconcileParams>,
    body: Bytes,
) -> Response {
    export_report(&state, &params, SheetFormat::Csv, &body).await
}

/// Excel 对账并直接下载 .xlsx 报表（配对或残余）
pub async fn export_xlsx(
    State(state): State<AppState>,
    Query(params): Query<ReconcileParams>,
    body: Bytes,
) -> Response {
    export_report(&state, &params, SheetFormat::Xlsx, &body).await
}

async fn export_report(
    state: &AppState,
    params: &ReconcileParams,
    format: SheetFormat,
    body: &[u8],
) -> Response {
    let outcome = match reconcile_upload(state, params, format, body).await {
        Ok(outcome) => outcome,
        Err(resp) => return resp,
    };

    let buf = match render_report(format, params.report, &outcome) {
        Ok(buf) => buf,
        Err(e) => return error_response(e),
    };

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!(
                    "attachment; filename=\"{}.{}\"",
                    params.report.file_stem(),
                    format.extension()
                ),
            ),
        ],
        buf,
    )
        .into_response()
}

fn render_report(
    format: SheetFormat,
    kind: ReportKind,
    outcome: &Reconciliation,
) -> Result<Vec<u8>, ReconcileError> {
    match (format, kind) {
        (SheetFormat::Csv, ReportKind::Pairs) => {
            let mut buf = Vec::new();
            io::write_pairs_csv(&mut buf, &outcome.pairs)?;
            Ok(buf)
        }
        (SheetFormat::Csv, ReportKind::Residue) => {
            let mut buf = Vec::new();
            io::write_residue_csv(&mut buf, &outcome.residue)?;
            Ok(buf)
        }
        (SheetFormat::Xlsx, ReportKind::Pairs) => io::write_pairs_xlsx(&outcome.pairs),
        (SheetFormat::Xlsx, ReportKind::Residue) => io::write_residue_xlsx(&outcome.residue),
    }
}

async fn reconcile_upload(
    state: &AppState,
    params: &ReconcileParams,
    format: SheetFormat,
    body: &[u8],
) -> Result<Reconciliation, Response> {
    let tolerance = match params.tolerance.as_deref() {
        None => state.defaults.tolerance.clone(),
        Some(t) => BigDecimal::from_str(t.trim()).map_err(|_| {
            failure(StatusCode::BAD_REQUEST, format!("invalid tolerance '{}'", t))
        })?,
    };
    let threshold = params
        .similarity_threshold
        .unwrap_or(state.defaults.similarity_threshold);

    let entries = io::load_ledger(format, body, &state.layout).map_err(error_response)?;
    run(state, entries, tolerance, threshold).await
}

/// 在阻塞线程池中执行对账（纯 CPU 计算）
async fn run(
    state: &AppState,
    entries: Vec<LedgerEntry>,
    tolerance: BigDecimal,
    threshold: f64,
) -> Result<Reconciliation, Response> {
    let reconciler = state.reconciler.clone();
    let joined = tokio::task::spawn_blocking(move || {
        reconciler.reconcile(&entries, &tolerance, threshold)
    })
    .await;

    match joined {
        Ok(Ok(outcome)) => Ok(outcome),
        Ok(Err(e)) => Err(error_response(e)),
        Err(e) => {
            tracing::error!("reconcile task failed: {}", e);
            Err(failure(StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {}", e)))
        }
    }
}

fn entries_from_request(inputs: Vec<EntryInput>) -> Result<Vec<LedgerEntry>, ReconcileError> {
    inputs
        .into_iter()
        .enumerate()
        .map(|(id, input)| {
            // 显式 null 与空串同样处理：日期报错，描述/金额降级
            let cells = RowCells {
                date: input
                    .date
                    .map(|d| DateCell::Text(d.unwrap_or_default())),
                description: input.description.map(Option::unwrap_or_default),
                debit: input
                    .debit
                    .map(|a| a.unwrap_or_else(|| RawAmount::Text(String::new()))),
                credit: input
                    .credit
                    .map(|a| a.unwrap_or_else(|| RawAmount::Text(String::new()))),
            };
            cells.into_entry(id, id)
        })
        .collect()
}

/// 参数用严格解析：小数点为 '.'，不做千分位处理
fn strict_decimal(raw: &RawAmount) -> Option<BigDecimal> {
    match raw {
        RawAmount::Number(n) => decimal_from_f64(*n),
        RawAmount::Text(s) => BigDecimal::from_str(s.trim()).ok(),
    }
}

fn respond(outcome: Result<Reconciliation, Response>) -> Response {
    match outcome {
        Ok(result) => {
            let response = ReconcileResponse {
                success: true,
                message: format!(
                    "Matched {} pairs, {} entries left unmatched",
                    result.stats.matched_pairs, result.stats.residue_entries
                ),
                result: Some(result),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(resp) => resp,
    }
}

fn error_response(e: ReconcileError) -> Response {
    let status = if e.is_input_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    tracing::warn!("reconcile rejected: {}", e);
    failure(status, format!("Error: {}", e))
}

fn failure(status: StatusCode, message: String) -> Response {
    let response = ReconcileResponse {
        success: false,
        message,
        result: None,
    };
    (status, Json(response)).into_response()
}
