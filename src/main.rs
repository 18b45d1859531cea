use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cinematch::{
    api::{create_router, AppState},
    Artifacts, Config, Corpus, Generation,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("cinematch=info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    match std::env::args().nth(1).as_deref() {
        Some("build") => build(config).await,
        None | Some("serve") => serve(config).await,
        Some(other) => anyhow::bail!("Unknown command: {} (expected `build` or `serve`)", other),
    }
}

/// Offline build: CSV corpus in, artifacts file out
async fn build(config: Config) -> anyhow::Result<()> {
    tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
        let corpus = Corpus::load(&config.data_dir)
            .with_context(|| format!("Failed to load corpus from {}", config.data_dir.display()))?;
        let artifacts = Artifacts::build(&corpus, &config.factorization())?;
        artifacts.save(&config.artifacts_path)?;
        Ok(())
    })
    .await?
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let startup = config.clone();
    let artifacts = tokio::task::spawn_blocking(move || -> anyhow::Result<Artifacts> {
        if startup.artifacts_path.exists() {
            return Ok(Artifacts::load(&startup.artifacts_path)?);
        }

        tracing::warn!(
            path = %startup.artifacts_path.display(),
            "No artifacts found, building from corpus"
        );
        let corpus = Corpus::load(&startup.data_dir).with_context(|| {
            format!("Failed to load corpus from {}", startup.data_dir.display())
        })?;
        let artifacts = Artifacts::build(&corpus, &startup.factorization())?;
        artifacts.save(&startup.artifacts_path)?;
        Ok(artifacts)
    })
    .await??;

    let generation = Generation::from_artifacts(artifacts, config.engine());
    let address = config.bind_address();
    let app = create_router(AppState::new(generation, config));

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    tracing::info!(address = %address, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}
