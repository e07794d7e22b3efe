use std::sync::Arc;

use feedbackiq::analysis::AnalysisEngine;
use feedbackiq::classifier::ClassifierClient;
use feedbackiq::config::{ClassifierConfig, HttpConfig, SyncPolicy};
use feedbackiq::destinations::{DestinationKind, DestinationRegistry};
use feedbackiq::store::{Database, LibSqlBackend};
use feedbackiq::sync::{SyncEngine, TriggerKind};
use uuid::Uuid;

const USAGE: &str = "Usage:
  feedbackiq analyze <feedback-id>
  feedbackiq sync <org-id> <destination> [manual|scheduled|event]
  feedbackiq history <org-id>";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first().map(String::as_str) else {
        eprintln!("{USAGE}");
        std::process::exit(2);
    };

    // ── Database ─────────────────────────────────────────────────────────
    let db_path =
        std::env::var("FEEDBACKIQ_DB_PATH").unwrap_or_else(|_| "./data/feedbackiq.db".to_string());

    let db: Arc<dyn Database> = Arc::new(
        LibSqlBackend::new_local(std::path::Path::new(&db_path))
            .await
            .unwrap_or_else(|e| {
                eprintln!("Error: Failed to open database at {db_path}: {e}");
                std::process::exit(1);
            }),
    );

    eprintln!("📊 FeedbackIQ v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Database: {db_path}\n");

    match command {
        "analyze" => {
            let id = parse_uuid_arg(args.get(1), "feedback-id");

            let config = ClassifierConfig::from_env().unwrap_or_else(|e| {
                eprintln!("Error: {e}");
                eprintln!("  export FEEDBACKIQ_CLASSIFIER_KEY=...");
                std::process::exit(1);
            });
            let classifier = Arc::new(ClassifierClient::new(config));
            let engine = AnalysisEngine::new(classifier, db);

            let result = engine.analyze(id).await?;
            println!("Category:       {}", result.analysis.category);
            println!("Urgency:        {}", result.analysis.urgency);
            println!("Sentiment:      {}", result.analysis.sentiment);
            println!("Impact score:   {}", result.analysis.impact_score);
            println!("Priority score: {}", result.analysis.priority_score);
            println!("Key themes:     {}", result.analysis.key_themes.join(", "));
            println!("Summary:        {}", result.summary);
        }
        "sync" => {
            let org_id = parse_uuid_arg(args.get(1), "org-id");
            let kind: DestinationKind = parse_arg(args.get(2), "destination");
            let trigger: TriggerKind = args
                .get(3)
                .map(|raw| parse_arg(Some(raw), "trigger"))
                .unwrap_or(TriggerKind::Manual);

            let destinations = Arc::new(DestinationRegistry::with_defaults(&HttpConfig::default()));
            let engine = SyncEngine::new(db, destinations, SyncPolicy::default());

            let run = engine.run_sync(org_id, kind, trigger).await?;
            println!(
                "Sync {}: {} item(s) synced, {} failure(s)",
                run.status,
                run.items_synced,
                run.errors.len()
            );
            for error in &run.errors {
                println!("  {} — {}", error.item_id, error.detail);
            }
        }
        "history" => {
            let org_id = parse_uuid_arg(args.get(1), "org-id");
            let runs = db.list_sync_runs(org_id, 20).await?;
            if runs.is_empty() {
                println!("No sync runs recorded.");
            }
            for run in runs {
                println!(
                    "{}  {:<7} {:<9} {:>3} synced  {:>2} failed  ({})",
                    run.created_at.format("%Y-%m-%d %H:%M:%S"),
                    run.destination,
                    run.status,
                    run.items_synced,
                    run.errors.len(),
                    run.trigger,
                );
            }
        }
        other => {
            eprintln!("Unknown command: {other}\n{USAGE}");
            std::process::exit(2);
        }
    }

    Ok(())
}

fn parse_uuid_arg(raw: Option<&String>, name: &str) -> Uuid {
    let Some(raw) = raw else {
        eprintln!("Missing <{name}>\n{USAGE}");
        std::process::exit(2);
    };
    Uuid::parse_str(raw).unwrap_or_else(|_| {
        eprintln!("Invalid <{name}>: {raw}");
        std::process::exit(2);
    })
}

fn parse_arg<T: std::str::FromStr<Err = String>>(raw: Option<&String>, name: &str) -> T {
    let Some(raw) = raw else {
        eprintln!("Missing <{name}>\n{USAGE}");
        std::process::exit(2);
    };
    raw.parse().unwrap_or_else(|e| {
        eprintln!("Invalid <{name}>: {e}");
        std::process::exit(2);
    })
}
