use clap::{Parser, Subcommand};
use folio::service::sheets_gateway::parse_rows;
use folio::types::{FileTypeFilter, SearchRequest, UserOAuthToken};
use folio::{Config, FolioContext, RequestContext};
use mimalloc::MiMalloc;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser)]
#[command(name = "folio")]
#[command(version, about = "Search Drive documents and flag scanned PDFs")]
struct Cli {
    /// JSON file holding a user OAuth token (access_token, refresh_token, expiry)
    #[arg(long, global = true)]
    user_token: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search by text and/or folder, classifying each PDF
    Search {
        /// Free-text term matched against names and indexed content
        #[arg(short, long)]
        query: Option<String>,

        /// Folder id; searches its whole subtree
        #[arg(short, long)]
        folder: Option<String>,

        /// pdf or any
        #[arg(short = 't', long)]
        file_type: Option<FileTypeFilter>,

        /// Results per listing call (default from config)
        #[arg(short = 'n', long)]
        page_size: Option<u32>,

        /// Only return files without a text layer
        #[arg(long)]
        illegible_only: bool,
    },

    /// Spreadsheet operations
    Sheets {
        #[command(subcommand)]
        command: SheetsCommand,
    },

    /// Queue a file for text re-extraction
    Reindex { file_id: String },

    /// Print the consent URL and CSRF state
    AuthUrl,

    /// Exchange an authorization code for a user token
    ExchangeCode { code: String },

    /// Show the signed-in user's profile (requires --user-token)
    Profile,
}

#[derive(Subcommand)]
enum SheetsCommand {
    /// Title and tabs of a spreadsheet
    Info { spreadsheet_id: String },

    /// Read a range in A1 notation
    Read {
        spreadsheet_id: String,
        range: String,
    },

    /// Append rows given as a JSON array of arrays
    Append {
        spreadsheet_id: String,
        range: String,
        /// e.g. '[["2024-01-01", 42]]'
        values: String,
    },
}

#[derive(Serialize)]
struct AuthUrlOutput {
    url: String,
    state: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let cfg = match Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.basic.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        proxy = %cfg.basic.proxy.as_ref().map(|u| u.as_str()).unwrap_or("<none>"),
        loglevel = %cfg.basic.loglevel,
        drive_base = %cfg.endpoints.drive_base
    );

    match run(cli, cfg).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "command failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, cfg: Config) -> Result<(), Box<dyn std::error::Error>> {
    let default_page_size = cfg.search.default_page_size;
    let ctx = FolioContext::new(cfg)?;
    let request_ctx = match cli.user_token.as_deref() {
        Some(path) => RequestContext::with_user_token(read_user_token(path)?),
        None => RequestContext::anonymous(),
    };

    match cli.command {
        Commands::Search {
            query,
            folder,
            file_type,
            page_size,
            illegible_only,
        } => {
            let request = SearchRequest {
                text_query: query,
                folder_scope: folder,
                file_type,
                page_size: page_size.unwrap_or(default_page_size),
                illegible_only,
            };
            print_json(&ctx.search(&request_ctx, &request).await?)?;
        }
        Commands::Sheets { command } => match command {
            SheetsCommand::Info { spreadsheet_id } => {
                print_json(&ctx.spreadsheet_metadata(&request_ctx, &spreadsheet_id).await?)?;
            }
            SheetsCommand::Read {
                spreadsheet_id,
                range,
            } => {
                print_json(&ctx.read_range(&request_ctx, &spreadsheet_id, &range).await?)?;
            }
            SheetsCommand::Append {
                spreadsheet_id,
                range,
                values,
            } => {
                let rows = parse_rows(&serde_json::from_str(&values)?)?;
                print_json(
                    &ctx.append_rows(&request_ctx, &spreadsheet_id, &range, &rows)
                        .await?,
                )?;
            }
        },
        Commands::Reindex { file_id } => {
            ctx.reindex(&file_id)?;
            print_json(&serde_json::json!({ "queued": file_id.trim() }))?;
            ctx.shutdown().await;
        }
        Commands::AuthUrl => {
            let (url, state) = ctx.authorize_url()?;
            print_json(&AuthUrlOutput {
                url: url.to_string(),
                state,
            })?;
        }
        Commands::ExchangeCode { code } => {
            print_json(&ctx.exchange_code(&code).await?)?;
        }
        Commands::Profile => {
            print_json(&ctx.fetch_profile(&request_ctx).await?)?;
        }
    }
    Ok(())
}

fn read_user_token(path: &Path) -> Result<UserOAuthToken, Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(path)?;
    let payload: serde_json::Value = serde_json::from_str(&raw)?;
    Ok(UserOAuthToken::from_payload(&payload)?)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
