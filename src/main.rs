use std::net::SocketAddr;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    userdir::telemetry::setup_logging();

    let mut state = userdir::initialize_state().await?;

    match userdir::telemetry::setup_metrics_recorder() {
        Ok(handle) => state = state.with_metrics(handle),
        Err(err) => tracing::warn!(error = %err, "cannot install metrics recorder"),
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.port));
    let app = userdir::app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %err, "cannot listen for shutdown signal");
            }
        })
        .await?;

    Ok(())
}
