use std::sync::Arc;

use anyhow::Context;

use gatekeeper::authz::Authorizer;
use gatekeeper::config::{AppConfig, DecisionLog};
use gatekeeper::events::{self, BroadcastSink, DecisionSink, NoopSink, TracingSink};
use gatekeeper::{create_app, docs};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_env();
    init_tracing();

    let config = AppConfig::from_env()?;

    let registry = config
        .load_registry()
        .with_context(|| format!("failed to load registry from {}", config.registry_path.display()))?;
    for warning in registry.lint() {
        tracing::warn!("registry: {}", warning);
    }
    tracing::info!(
        "loaded registry from {} ({} roles, {} routes)",
        config.registry_path.display(),
        registry.roles().count(),
        registry.routes().len()
    );

    let sink: Arc<dyn DecisionSink> = match config.decision_log {
        DecisionLog::Tracing => Arc::new(TracingSink),
        DecisionLog::Broadcast => {
            let (bus, rx) = events::init_event_bus();
            tokio::spawn(events::start_decision_listener(rx));
            Arc::new(BroadcastSink::new(bus))
        }
        DecisionLog::Off => Arc::new(NoopSink),
    };

    let authorizer = Authorizer::new(Arc::new(registry)).with_sink(sink);

    let openapi = docs::build_openapi(config.port)?;
    let app = create_app(authorizer).merge(docs::swagger_routes(openapi)?);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

fn load_env() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    let crate_env = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    let _ = dotenvy::from_path(crate_env);
}

fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false);

    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
