//! form-autofill: scrape a job-application form, map it to a stored user
//! profile and fill it in Chrome.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use form_autofill::profile::{DEFAULT_STORE_PATH, DEFAULT_USER_ID};
use form_autofill::{
    autofill, generate_instructions, map_fields, AutofillOptions, AutofillRequest, BrowserBuilder,
    Error, ProfileStore, Result, ScrapeConfig, Scraper,
};

#[derive(Parser)]
#[command(name = "form-autofill")]
#[command(about = "Scrape, map and fill job-application forms")]
#[command(version)]
struct Cli {
    /// Profile store file
    #[arg(long, default_value = DEFAULT_STORE_PATH, global = true)]
    store: PathBuf,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the form fields found at a URL as JSON
    Scrape { url: String },

    /// Print the dot-paths of a stored profile
    Schema {
        #[arg(long, default_value = DEFAULT_USER_ID)]
        user: String,
    },

    /// Run the whole pipeline against a form
    Fill {
        url: String,

        #[arg(long, default_value = DEFAULT_USER_ID)]
        user: String,

        /// Follow one "next" control and fill the second page too
        #[arg(long)]
        paginate: bool,

        /// Show the browser window
        #[arg(long)]
        headed: bool,

        /// Chrome executable to launch instead of the detected one
        #[arg(long)]
        chrome: Option<String>,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "form_autofill=debug" } else { "form_autofill=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Scrape { url } => {
            let scraper = Scraper::new(ScrapeConfig::default())?;
            print_json(&scraper.scrape(&url).await?)
        }
        Commands::Schema { user } => {
            let mut store = ProfileStore::open(&cli.store)?;
            store.ensure_default()?;
            let schema = store
                .schema(&user)
                .ok_or_else(|| Error::Profile(format!("unknown user '{user}'")))?;
            print_json(&schema)
        }
        Commands::Fill {
            url,
            user,
            paginate,
            headed,
            chrome,
        } => {
            let mut store = ProfileStore::open(&cli.store)?;
            store.ensure_default()?;
            let profile = store
                .get(&user)
                .ok_or_else(|| Error::Profile(format!("unknown user '{user}'")))?
                .flatten();

            let form = Scraper::new(ScrapeConfig::default())?.scrape(&url).await?;
            let mapping = map_fields(&form.fields, &profile, &form.url);
            if !mapping.unmapped_required.is_empty() {
                warn!(fields = ?mapping.unmapped_required, "required fields without a profile value");
            }
            if form.has_pagination && !paginate {
                info!("form looks paginated; pass --paginate to fill the next page");
            }
            let instructions = generate_instructions(&mapping);

            let request = AutofillRequest {
                form_url: instructions.form_url,
                fields: instructions.fields,
                options: AutofillOptions {
                    handle_pagination: paginate,
                    keep_browser_open: false,
                    ..AutofillOptions::default()
                },
            };
            let mut builder = BrowserBuilder::new().headless(!headed);
            if let Some(path) = chrome {
                builder = builder.chrome_path(path);
            }
            let session = builder.build();
            let result = autofill(&session, &request).await;
            info!(success = result.success, fill_rate = result.metrics.fill_rate, "done");
            print_json(&result)
        }
    }
}
