use axum::extract::DefaultBodyLimit;
use ledger_recon::{api, AppConfig, Reconciler};
use tower::ServiceBuilder;
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志 - 使用本地时间格式
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .init();

    // 加载配置
    let config = AppConfig::from_env()?;
    info!("Starting server with config: {:?}", config);

    // 创建对账服务（归一化正则在这里编译，配置有误则直接退出）
    let reconciler = Reconciler::new(&config.matching)?;
    let state = api::AppState::new(reconciler, config.matching.clone(), config.csv.clone());

    let app = api::router(state).layer(
        ServiceBuilder::new().layer(DefaultBodyLimit::max(config.server.max_upload_bytes)),
    );

    // 启动服务器
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  POST /api/reconcile              - JSON entries");
    info!("  POST /api/reconcile/csv          - ledger CSV upload");
    info!("  POST /api/reconcile/csv/export   - CSV report download");
    info!("  POST /api/reconcile/xlsx         - ledger xlsx upload");
    info!("  POST /api/reconcile/xlsx/export  - xlsx report download");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
