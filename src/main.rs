use clap::{Parser, ValueEnum};
use std::error::Error;
use std::io::Write;
use std::path::PathBuf;
use storage_quickstart::storage::config::{require_env, CONNECTION_STRING_ENV};
use storage_quickstart::{Quickstart, QuickstartOptions, StorageConfig, StorageError, StorageOps};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Backend {
    Azure,
    Local,
    Memory,
}

/// Azure Storage quickstart: blob container round trip and file share upload.
#[derive(Parser, Debug, Clone)]
#[command(name = "storage-quickstart", version, about)]
struct Cli {
    /// Storage backend to run against
    #[arg(long, value_enum, default_value_t = Backend::Azure)]
    backend: Backend,

    /// Storage account connection string (azure backend); read from
    /// AZURE_STORAGE_CONNECTION_STRING when omitted
    #[arg(long)]
    connection_string: Option<String>,

    /// Root directory standing in for the account (local backend)
    #[arg(long)]
    local_root: Option<PathBuf>,

    /// Directory where file shares live (a mounted share for azure)
    #[arg(long)]
    share_path: Option<PathBuf>,

    /// Directory for the generated and downloaded files
    #[arg(long, default_value = "./data")]
    data_dir: PathBuf,

    /// Local file to upload to the file share; skipped when unset
    #[arg(long)]
    share_source: Option<PathBuf>,

    /// Clean up without prompting
    #[arg(long, default_value_t = false)]
    yes: bool,

    /// Print the report as JSON
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Per-operation timeout in seconds (0 disables it)
    #[arg(long)]
    timeout: Option<u64>,
}

impl Cli {
    /// The `--connection-string` flag, falling back to the environment.
    fn connection_string(&self) -> Result<String, StorageError> {
        match &self.connection_string {
            Some(value) => Ok(value.clone()),
            None => require_env(CONNECTION_STRING_ENV),
        }
    }

    async fn storage_config(&self) -> Result<StorageConfig, StorageError> {
        let mut config = match self.backend {
            Backend::Azure => StorageConfig::from_connection_string(&self.connection_string()?)?,
            Backend::Local => {
                let root = self.local_root.as_ref().ok_or_else(|| {
                    StorageError::ConfigError("The local backend requires --local-root".to_string())
                })?;
                tokio::fs::create_dir_all(root).await?;
                StorageConfig::local().with_option("path", root.display().to_string())
            }
            Backend::Memory => StorageConfig::memory(),
        };

        if let Some(share_path) = &self.share_path {
            if self.backend == Backend::Local {
                tokio::fs::create_dir_all(share_path).await?;
            }
            config = config.with_option("share_path", share_path.display().to_string());
        }
        if let Some(timeout) = self.timeout {
            config = config.with_option("timeout", timeout.to_string());
        }
        Ok(config)
    }
}

fn prompt_on_stdin(prompt: &str) -> bool {
    print!("{}", prompt);
    if std::io::stdout().flush().is_err() {
        return false;
    }
    let mut line = String::new();
    std::io::stdin().read_line(&mut line).is_ok()
}

async fn run(cli: Cli, token: CancellationToken) -> Result<(), Box<dyn Error + Send + Sync>> {
    let config = cli.storage_config().await?;
    info!("Using storage config={:?}", config);

    let ops = StorageOps::builder(config)
        .with_cancellation(token)
        .build()
        .await?;
    let options = QuickstartOptions {
        data_dir: cli.data_dir.clone(),
        share_source: cli.share_source.clone(),
        ..Default::default()
    };

    let quickstart = Quickstart::new(ops, options);
    let report = if cli.yes {
        quickstart.run(|_: &str| true).await?
    } else {
        quickstart.run(prompt_on_stdin).await?
    };

    if cli.json {
        println!("{}", report.to_json()?);
    } else {
        println!("{}", report);
    }
    Ok(())
}

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Starting Storage Quickstart");

    let cli = Cli::parse();
    let token = CancellationToken::new();
    let ctrl_c_token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_token.cancel();
        }
    });

    if let Err(e) = run(cli, token).await {
        error!("Quickstart failed: {}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
