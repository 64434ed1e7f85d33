use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::{json, Map, Value};

use site_config::config::loader::{from_env, load_config};
use site_config::config::AppConfig;
use site_config::document::migrate;
use site_config::media::{MediaFile, MediaKind, UploadSettings, Uploader};
use site_config::sync::{ConfigLoader, ConfigStore, FileLocalStore, LocalStore, Mode, RemotePublisher};

#[derive(Parser)]
#[command(name = "site-config-cli")]
#[command(about = "Management CLI for the site configuration service", long_about = None)]
struct Cli {
    /// Base URL of the service.
    #[arg(short, long, default_value = "http://localhost:8787")]
    url: String,

    /// Admin token for writes.
    #[arg(short, long, env = "ADMIN_TOKEN")]
    token: Option<String>,

    /// Service/client TOML config (for load, publish, export, upload).
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the stored document
    Get,
    /// Replace the stored document with a JSON file
    Put { file: PathBuf },
    /// Request an upload signature
    Sign {
        #[arg(long)]
        folder: Option<String>,
        #[arg(long)]
        public_id: Option<String>,
        #[arg(long)]
        overwrite: bool,
        #[arg(long)]
        timestamp: Option<i64>,
    },
    /// Run the loader and print the effective document
    Load {
        /// Include the local override
        #[arg(long)]
        admin: bool,
    },
    /// Normalize a document file and print it
    Migrate { file: PathBuf },
    /// Load in admin mode and publish to the remote endpoint
    Publish,
    /// Load in admin mode and write the document to a file
    Export {
        #[arg(short, long, default_value = "config.json")]
        out: PathBuf,
    },
    /// Upload an image or video to the media host
    Upload { file: PathBuf },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    if let Some(token) = &cli.token {
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", token))?);
    }

    match &cli.command {
        Commands::Get => {
            let res = client.get(format!("{}/config", cli.url)).send().await?;
            print_response(res).await?;
        }
        Commands::Put { file } => {
            let body = tokio::fs::read_to_string(file).await?;
            let res = client
                .put(format!("{}/config", cli.url))
                .headers(headers)
                .header(CONTENT_TYPE, "application/json")
                .body(body)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Sign { folder, public_id, overwrite, timestamp } => {
            let mut body = Map::new();
            if let Some(ts) = timestamp {
                body.insert("timestamp".into(), json!(ts));
            }
            if let Some(folder) = folder {
                body.insert("folder".into(), json!(folder));
            }
            if let Some(id) = public_id {
                body.insert("public_id".into(), json!(id));
            }
            if *overwrite {
                body.insert("overwrite".into(), json!(true));
            }
            let res = client
                .post(format!("{}/cloudinary/sign", cli.url))
                .json(&Value::Object(body))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Load { admin } => {
            let config = app_config(cli.config.as_deref())?;
            let mode = if *admin { Mode::Admin } else { Mode::Visitor };
            let loader = ConfigLoader::from_config(&config.client, client, Some(local_store(&config)), mode);
            println!("{}", serde_json::to_string_pretty(&loader.load().await)?);
        }
        Commands::Migrate { file } => {
            let text = tokio::fs::read_to_string(file).await?;
            let doc: Value = serde_json::from_str(&text)?;
            println!("{}", serde_json::to_string_pretty(&migrate(doc))?);
        }
        Commands::Publish => {
            let config = app_config(cli.config.as_deref())?;
            let store = admin_store(&config, client).await;
            store.publish().await?;
            println!("Published");
        }
        Commands::Export { out } => {
            let config = app_config(cli.config.as_deref())?;
            let store = admin_store(&config, client).await;
            store.export_to(out)?;
            println!("Wrote {}", out.display());
        }
        Commands::Upload { file } => {
            let config = app_config(cli.config.as_deref())?;
            let loader = ConfigLoader::from_config(&config.client, client.clone(), Some(local_store(&config)), Mode::Admin);
            let doc = loader.load().await;
            let settings = UploadSettings::resolve(&doc, &config.client.media);

            let file_name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "upload".to_string());
            let content_type = MediaKind::guess_content_type(&file_name)
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = tokio::fs::read(file).await?;

            let url = Uploader::new(client, settings)
                .upload(MediaFile { file_name, content_type, bytes })
                .await?;
            println!("{}", url);
        }
    }

    Ok(())
}

fn app_config(path: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    Ok(match path {
        Some(path) => load_config(path)?,
        None => from_env()?,
    })
}

fn local_store(config: &AppConfig) -> Arc<dyn LocalStore> {
    Arc::new(FileLocalStore::new(&config.client.local_path, config.client.local_quota_bytes))
}

async fn admin_store(config: &AppConfig, client: reqwest::Client) -> ConfigStore {
    let local = local_store(config);
    let loader = ConfigLoader::from_config(&config.client, client.clone(), Some(local.clone()), Mode::Admin);
    let store = ConfigStore::new(local, RemotePublisher::from_config(&config.client, client));
    store.load(&loader).await;
    store
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    if !status.is_success() {
        eprintln!("Error: service returned status {}", status);
        if !text.is_empty() {
            eprintln!("{}", text);
        }
        std::process::exit(1);
    }
    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}
