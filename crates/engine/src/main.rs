//! Overman engine - bootstraps the quest database.
//!
//! Creates the schema, seeds the built-in category branches and reports the
//! catalog it found.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use overman_engine::infrastructure::{
    clock::SystemClock,
    config::EngineConfig,
    persistence::{SqliteDatabase, SqliteQuestStore},
    ports::QuestSetNotifier,
    recommendation::{NoopNotifier, RecommendationClient},
};
use overman_engine::App;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment from repo root (the engine may run from `crates/engine`).
    load_dotenv_from_repo_root();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "overman_engine=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Overman Engine");

    let config = EngineConfig::from_env()?;

    tracing::info!("Opening database at {}", config.database_url);
    let db = SqliteDatabase::connect(&config.database_url, config.max_connections).await?;
    db.initialize_schema().await?;

    let notifier: Arc<dyn QuestSetNotifier> = match &config.recommendation_base_url {
        Some(url) => {
            tracing::info!(url = %url, "Recommendation notifications enabled");
            Arc::new(RecommendationClient::with_timeout(
                url,
                config.notify_timeout_secs,
            ))
        }
        None => {
            tracing::info!("RECOMMENDATION_BASE_URL not set, notifications disabled");
            Arc::new(NoopNotifier)
        }
    };

    let app = App::new(
        Arc::new(SqliteQuestStore::new(db)),
        notifier,
        Arc::new(SystemClock::new()),
        &config,
    );

    let seeded = app.use_cases.catalog.ensure_category_branches().await?;
    let branches = app.use_cases.catalog.list_branches().await?;
    tracing::info!(
        seeded,
        branches = branches.len(),
        freeze_cost = config.habit_freeze_cost,
        "Quest engine ready"
    );

    Ok(())
}

fn load_dotenv_from_repo_root() {
    let repo_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..");

    // Prefer local overrides.
    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}
