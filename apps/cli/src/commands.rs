//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use docenrich_core::{Context, ALL_STEPS, Step, enrich_document, parse_steps};
use docenrich_fetch::{FetchOptions, HttpFetcher, SiteRegistry};
use docenrich_shared::{
    AppConfig, Document, config_file_path, init_config, load_config, load_config_from,
};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// docenrich: add publish, schedule and url data to page documents.
#[derive(Parser)]
#[command(
    name = "docenrich",
    version,
    about = "Enrich page documents with derived publish, schedule and url fields.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.docenrich/docenrich.toml.
    #[arg(long, global = true, env = "DOCENRICH_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Enrich one document and print the result.
    Enrich {
        /// Document uri, e.g. `foo.com/pages/1`.
        #[arg(long, required_unless_present = "doc")]
        uri: Option<String>,

        /// Public url of the document, if it already has one.
        #[arg(long)]
        url: Option<String>,

        /// Read the document from a JSON file instead of --uri/--url.
        #[arg(long, conflicts_with_all = ["uri", "url"])]
        doc: Option<PathBuf>,

        /// Base address for same-site fetches (defaults to config).
        #[arg(long)]
        prefix: Option<String>,

        /// Site key from the config's [[sites]] table.
        #[arg(long)]
        site: Option<String>,

        /// Steps to run (comma-separated). Defaults to config.
        #[arg(long, value_delimiter = ',')]
        steps: Option<Vec<String>>,
    },

    /// List the available enrichment steps.
    Steps,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "docenrich=info",
        1 => "docenrich=debug",
        _ => "docenrich=trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };

    match cli.command {
        Command::Enrich {
            uri,
            url,
            doc,
            prefix,
            site,
            steps,
        } => {
            let document = match doc {
                Some(path) => read_document(&path)?,
                None => {
                    let uri = uri.ok_or_else(|| eyre!("--uri is required without --doc"))?;
                    Document {
                        uri,
                        url,
                        ..Document::default()
                    }
                }
            };
            let opts = EnrichOptions {
                prefix,
                site,
                steps,
            };
            cmd_enrich(&config, document, opts).await
        }
        Command::Steps => cmd_steps(),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(&config),
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

/// CLI overrides for an enrichment run.
struct EnrichOptions {
    prefix: Option<String>,
    site: Option<String>,
    steps: Option<Vec<String>>,
}

fn read_document(path: &Path) -> Result<Document> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| eyre!("cannot read document {}: {e}", path.display()))?;
    serde_json::from_str(&raw).map_err(|e| eyre!("invalid document {}: {e}", path.display()))
}

async fn cmd_enrich(config: &AppConfig, document: Document, opts: EnrichOptions) -> Result<()> {
    let prefix = opts.prefix.unwrap_or_else(|| config.defaults.prefix.clone());
    let step_names = opts.steps.unwrap_or_else(|| config.defaults.steps.clone());
    let steps: Vec<Step> = parse_steps(step_names.as_slice())?;

    let registry = SiteRegistry::from_config(config);
    let site = match opts.site.as_deref() {
        Some(key) => Some(registry.resolve_site(key)?),
        None => registry.site_for_uri(&document.uri).cloned(),
    };

    let fetcher = HttpFetcher::new(&FetchOptions::from(&config.http))?;
    let mut builder = Context::builder(Arc::new(fetcher)).prefix(&prefix);
    if let Some(site) = site {
        builder = builder.site(site);
    }
    let ctx = builder.build();

    info!(
        uri = %document.uri,
        %prefix,
        steps = %step_names.join(","),
        "enriching document"
    );

    let enriched = enrich_document(document, &ctx, &steps).await?;
    println!("{}", serde_json::to_string_pretty(&enriched)?);

    Ok(())
}

fn cmd_steps() -> Result<()> {
    for step in ALL_STEPS {
        println!("{step}");
    }
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config written to {}", path.display());
    Ok(())
}

fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let path = config_file_path()?;
    println!("# {}", path.display());
    println!("prefix  = {}", config.defaults.prefix);
    println!("steps   = {}", config.defaults.steps.join(", "));
    println!(
        "http    = timeout {}s, max {} redirects",
        config.http.timeout_secs, config.http.max_redirects
    );
    for site in &config.sites {
        println!("site    = {} (slug {}, host {})", site.key, site.slug, site.host);
    }
    Ok(())
}
