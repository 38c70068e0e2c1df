use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gallery_store::{
    config::Config,
    model::{Entity, Model},
    storage::Database,
};

/// Inspect and maintain gallery tables and blobs
#[derive(Parser, Debug)]
#[command(name = "gallery-store")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every gallery
    Galleries,
    /// List the files of a gallery
    Files {
        /// Gallery identity
        gallery: u64,
    },
    /// Print a file's metadata sidecar
    FileInfo {
        /// File identity
        eid: u64,
    },
    /// Delete a gallery, its files and their blobs
    RemoveGallery {
        /// External group id of the gallery
        tgid: i64,
    },
    /// List registered users
    Users,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = Config::load()?;
    let db = Database::from_config(&config.storage).await?;

    let output = match cli.command {
        Command::Galleries => rows(db.galleries().all().await?),
        Command::Files { gallery } => rows(db.files_in_gallery(gallery).await?),
        Command::FileInfo { eid } => db.file_metadata(eid).await?.unwrap_or(Value::Null),
        Command::RemoveGallery { tgid } => match db.remove_gallery(tgid).await? {
            Some(report) => {
                info!(tgid, files = report.files, "Gallery removed");
                json!({
                    "files": report.files,
                    "blobs": report.blobs,
                    "sidecars": report.sidecars,
                })
            }
            None => anyhow::bail!("no gallery registered for {tgid}"),
        },
        Command::Users => rows(db.users().all().await?),
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn rows<M: Model>(entities: Vec<Entity<M>>) -> Value {
    Value::Array(
        entities
            .iter()
            .map(|e| {
                let mut row = e.as_dict();
                if let Some(eid) = e.eid() {
                    row.insert("eid".to_string(), Value::from(eid));
                }
                Value::Object(row)
            })
            .collect(),
    )
}

fn init_tracing() {
    // Logs go to stderr; stdout carries the command output
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    match log_format.to_lowercase().as_str() {
        "gcp" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_stackdriver::layer().with_writer(std::io::stderr))
                .init();
        }
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_span_list(false)
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
