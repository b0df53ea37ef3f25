use anyhow::Context;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use grants_core::config::{
    approval_history_from_env_value, debounce_from_env_value, status_editor_roles_from_env_value,
};
use grants_core::constants::DEFAULT_DATA_DIR;
use grants_core::{CoreConfig, FormInstanceService};

/// Main entry point for the grants forms service
///
/// Resolves configuration once, then serves the REST API (with Swagger UI at `/swagger-ui`).
///
/// # Environment Variables
/// - `GRANTS_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `GRANTS_DATA_DIR`: Directory for templates, organisations and instances (default:
///   "grants_data"); must already exist
/// - `GRANTS_STATUS_EDITOR_ROLES`: Comma-separated roles allowed to change status and amount
///   (default: "ADMIN,PROGRAMME_OFFICER")
/// - `GRANTS_APPROVAL_HISTORY`: "preserve" or "clear" the approval timestamp when an approved
///   instance moves to another status (default: "preserve")
/// - `GRANTS_DEBOUNCE_MS`: Quiet period before a field edit is persisted (default: 500)
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("grants=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("GRANTS_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let data_dir = PathBuf::from(
        std::env::var("GRANTS_DATA_DIR").unwrap_or_else(|_| DEFAULT_DATA_DIR.into()),
    );
    if !data_dir.is_dir() {
        anyhow::bail!(
            "GRANTS_DATA_DIR {} does not exist or is not a directory",
            data_dir.display()
        );
    }

    let cfg = Arc::new(CoreConfig::new(
        data_dir,
        status_editor_roles_from_env_value(std::env::var("GRANTS_STATUS_EDITOR_ROLES").ok())?,
        approval_history_from_env_value(std::env::var("GRANTS_APPROVAL_HISTORY").ok())?,
        debounce_from_env_value(std::env::var("GRANTS_DEBOUNCE_MS").ok())?,
    )?);

    tracing::info!("++ Starting grants REST on {}", rest_addr);
    tracing::info!("++ Data directory {}", cfg.data_dir().display());

    let app = api_rest::router(FormInstanceService::new(cfg));

    let listener = tokio::net::TcpListener::bind(&rest_addr)
        .await
        .with_context(|| format!("binding {rest_addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}
