use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use ledger_recon::api::{router, AppState};
use ledger_recon::config::{CsvLayout, MatchingConfig};
use ledger_recon::Reconciler;
use rust_xlsxwriter::Workbook;
use serde_json::{json, Value};
use tower::ServiceExt;

fn app() -> Router {
    let matching = MatchingConfig::default();
    let reconciler = Reconciler::new(&matching).unwrap();
    router(AppState::new(reconciler, matching, CsvLayout::default()))
}

async fn send(request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

fn post_json(uri: &str, payload: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap()
}

fn post_text(uri: &str, payload: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "text/csv")
        .body(Body::from(payload.to_string()))
        .unwrap()
}

const LEDGER: &str = "\
Esercizio,Data_Reg,N_Reg,Sede,Descrizione,Data_Doc,N_Doc,Prot,Dare,Avere
2024,02/02/2024,1,A,PAGAMENTO SRL ROSSI,,,,\"100,00\",
2024,03/02/2024,2,A,ROSSI SRL,,,,,\"100,05\"
2024,03/02/2024,3,A,BIANCHI SRL,,,,,\"99,95\"
";

#[tokio::test]
async fn health() {
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"OK");
}

#[tokio::test]
async fn json_reconcile_uses_defaults() {
    let payload = json!({
        "entries": [
            {"date": "2024-02-02", "description": "PAGAMENTO SRL ROSSI", "debit": "100,00", "credit": null},
            {"date": "2024-02-03", "description": "ROSSI SRL", "debit": null, "credit": 100.05},
            {"date": "2024-02-03", "description": "BIANCHI SRL", "debit": "", "credit": "€ 99,95"},
            {"date": "2024-02-04", "description": null, "debit": null, "credit": null}
        ]
    });
    let (status, body) = send(post_json("/api/reconcile", payload)).await;
    assert_eq!(status, StatusCode::OK);

    let v: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["success"], true);
    let pairs = v["result"]["pairs"].as_array().unwrap();
    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0]["debit_id"], 0);
    assert_eq!(pairs[0]["credit_id"], 1);
    assert_eq!(v["result"]["residue"].as_array().unwrap().len(), 2);
    assert_eq!(v["result"]["stats"]["matched_pairs"], 1);
}

#[tokio::test]
async fn json_reconcile_rejects_structural_errors() {
    let conflicting = json!({
        "entries": [{"date": "2024-02-02", "description": "X", "debit": 1, "credit": 2}]
    });
    let (status, body) = send(post_json("/api/reconcile", conflicting)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let v: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["success"], false);
    assert!(v["result"].is_null());

    let bad_date = json!({
        "entries": [{"date": "someday", "description": "X", "debit": 1, "credit": null}]
    });
    let (status, _) = send(post_json("/api/reconcile", bad_date)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let bad_threshold = json!({"entries": [], "similarity_threshold": 2.0});
    let (status, _) = send(post_json("/api/reconcile", bad_threshold)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let bad_tolerance = json!({"entries": [], "tolerance": "ten cents"});
    let (status, _) = send(post_json("/api/reconcile", bad_tolerance)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn json_entry_without_required_field_is_rejected() {
    let cases = [
        (json!({"description": "ROSSI", "debit": 1, "credit": null}), "date"),
        (json!({"date": "2024-02-02", "debit": 1, "credit": null}), "description"),
        (json!({"date": "2024-02-02", "description": "ROSSI", "credit": 1}), "debit"),
        (json!({"date": "2024-02-02", "description": "ROSSI", "debit": 1}), "credit"),
    ];
    for (entry, field) in cases {
        let payload = json!({"entries": [entry]});
        let (status, body) = send(post_json("/api/reconcile", payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{field}");
        let v: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(v["success"], false);
        assert!(v["message"].as_str().unwrap().contains(field), "{v}");
    }
}

#[tokio::test]
async fn csv_reconcile_with_query_parameters() {
    let (status, body) = send(post_text("/api/reconcile/csv", LEDGER)).await;
    assert_eq!(status, StatusCode::OK);
    let v: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["result"]["stats"]["matched_pairs"], 1);

    // 容差收紧到 0.01 后没有任何配对
    let (status, body) = send(post_text(
        "/api/reconcile/csv?tolerance=0.01&similarity_threshold=0.3",
        LEDGER,
    ))
    .await;
    assert_eq!(status, StatusCode::OK);
    let v: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["result"]["stats"]["matched_pairs"], 0);
    assert_eq!(v["result"]["stats"]["residue_entries"], 3);
}

#[tokio::test]
async fn csv_export_reports() {
    let (status, body) = send(post_text("/api/reconcile/csv/export", LEDGER)).await;
    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(body).unwrap();
    assert!(text.starts_with("debit_id,debit_date,"));
    assert_eq!(text.lines().count(), 2);

    let (status, body) = send(post_text("/api/reconcile/csv/export?report=residue", LEDGER)).await;
    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(body).unwrap();
    assert_eq!(text, "id,date,description,debit,credit\n2,2024-02-03,BIANCHI SRL,0.00,99.95\n");
}

#[tokio::test]
async fn csv_missing_column_is_bad_request() {
    let (status, _) = send(post_text("/api/reconcile/csv", "h1,h2\n2024,02/02/2024\n")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

fn ledger_xlsx() -> Vec<u8> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for (row, line) in LEDGER.lines().enumerate() {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(line.as_bytes());
        let record = reader.records().next().unwrap().unwrap();
        for (col, field) in record.iter().enumerate() {
            if !field.is_empty() {
                sheet.write_string(row as u32, col as u16, field).unwrap();
            }
        }
    }
    workbook.save_to_buffer().unwrap()
}

fn post_xlsx(uri: &str, payload: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        )
        .body(Body::from(payload))
        .unwrap()
}

#[tokio::test]
async fn xlsx_upload_matches_csv_upload() {
    let (status, body) = send(post_xlsx("/api/reconcile/xlsx", ledger_xlsx())).await;
    assert_eq!(status, StatusCode::OK);
    let from_xlsx: Value = serde_json::from_slice(&body).unwrap();

    let (_, body) = send(post_text("/api/reconcile/csv", LEDGER)).await;
    let from_csv: Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(from_xlsx["result"]["stats"]["matched_pairs"], 1);
    assert_eq!(from_xlsx["result"], from_csv["result"]);
}

#[tokio::test]
async fn xlsx_export_is_a_workbook() {
    let response = app()
        .oneshot(post_xlsx("/api/reconcile/xlsx/export?report=residue", ledger_xlsx()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"report_residui.xlsx\""
    );
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    // xlsx 是 zip 容器
    assert!(body.starts_with(b"PK"));
}

#[tokio::test]
async fn xlsx_garbage_is_bad_request() {
    let (status, _) = send(post_xlsx("/api/reconcile/xlsx", b"not a workbook".to_vec())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
