//! Interactive console for the assistant.
//!
//! Usage: `dinver-chat <snapshot.json> [config.json]`
//!
//! Every line is one turn on a single thread. Commands: `:lang hr|en`,
//! `:at <lat> <lng>` (`:at off` clears the location) and `:quit`.

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use uuid::Uuid;

use dinver_ai::{AssistantConfig, AssistantRequest, InMemoryStore, Orchestrator};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("dinver_ai=info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let Some(snapshot_path) = args.next().map(PathBuf::from) else {
        bail!("usage: dinver-chat <snapshot.json> [config.json]");
    };

    let config = match args.next().map(PathBuf::from) {
        Some(path) => AssistantConfig::from_file(&path)?,
        None => {
            let default_path = AssistantConfig::default_path();
            if default_path.exists() {
                AssistantConfig::from_file(&default_path)?
            } else {
                let mut config = AssistantConfig::default();
                config.apply_env_overrides();
                config
            }
        }
    };

    let store = InMemoryStore::from_json_file(&snapshot_path)
        .with_context(|| format!("loading snapshot {}", snapshot_path.display()))?;
    let orchestrator = Orchestrator::from_config(config, Arc::new(store))?;

    let thread_id = Uuid::new_v4().to_string();
    let mut language: Option<String> = None;
    let mut location: Option<(f64, f64)> = None;

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    stdout.write_all(b"> ").await?;
    stdout.flush().await?;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        let mut words = line.split_whitespace();
        match words.next() {
            None => {}
            Some(":quit") => break,
            Some(":lang") => match words.next() {
                Some(code @ ("hr" | "en")) => language = Some(code.to_string()),
                _ => println!("usage: :lang hr|en"),
            },
            Some(":at") => match (words.next(), words.next()) {
                (Some("off"), _) => location = None,
                (Some(lat), Some(lng)) => match (lat.parse::<f64>(), lng.parse::<f64>()) {
                    (Ok(lat), Ok(lng)) => location = Some((lat, lng)),
                    _ => println!("usage: :at <lat> <lng>"),
                },
                _ => println!("usage: :at <lat> <lng>"),
            },
            Some(_) => {
                let request = AssistantRequest {
                    message: line.to_string(),
                    language: language.clone(),
                    latitude: location.map(|(lat, _)| lat),
                    longitude: location.map(|(_, lng)| lng),
                    radius_km: None,
                    thread_id: Some(thread_id.clone()),
                };
                let reply = orchestrator.respond_detailed(&request).await;
                println!("{}", reply.text);
                tracing::debug!(
                    intent = %reply.intent,
                    restaurant_id = reply.restaurant_id.as_deref(),
                    "reply sent"
                );
            }
        }
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
    }

    Ok(())
}
