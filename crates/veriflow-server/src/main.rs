use tracing::info;
use veriflow_core::VerifyConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "veriflow_server=info,veriflow_core=info,tower_http=warn".into()),
        )
        .init();

    let config = VerifyConfig::from_env();
    info!(
        service_url = %config.service_url,
        status_url = %config.status_url,
        mailbox = config.mailbox.is_some(),
        "configuration loaded"
    );

    let app = veriflow_server::router(config);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8080);
    let addr = format!("0.0.0.0:{port}");
    info!("listening on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
