//! Region research console - main entry point

mod cli;
mod markdown;
mod tui;

use clap::{Parser, Subcommand, ValueEnum};
use region_client::{HttpClient, ResearchStatus};
use region_foundation::{
    ConsoleConfig, ConsoleSettings, JsonStore, ThemeName, CONSOLE_CONFIG_FILE,
};
use region_task::{MonitorConfig, SearchConfig};
use std::fs::OpenOptions;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::{CreateOptions, ListOptions};
use crate::tui::Theme;

const LOG_FILE: &str = "console.log";

/// Admin console for region research tasks
#[derive(Parser, Debug)]
#[command(name = "region-console")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Research API base URL (overrides env and config)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Watch a research task live
    Watch {
        task_id: String,

        /// Poll interval in seconds
        #[arg(long)]
        interval: Option<u64>,

        /// Stop polling once the task completes, fails or is stopped
        #[arg(long)]
        stop_on_terminal: bool,
    },
    /// Print the current status of a research task
    Status {
        task_id: String,

        /// Print the raw JSON record
        #[arg(long)]
        json: bool,
    },
    /// Request a running research task to stop
    Stop { task_id: String },
    /// Print the report of a completed research task
    Report { task_id: String },
    /// List research tasks
    List {
        #[arg(long, value_parser = parse_status)]
        status: Option<ResearchStatus>,

        /// Region name filter
        #[arg(long)]
        region: Option<String>,

        #[arg(long)]
        municipality_id: Option<i64>,

        #[arg(long, default_value_t = 1)]
        page: u32,

        #[arg(long)]
        per_page: Option<u32>,
    },
    /// Start a new research task
    Create {
        #[arg(long)]
        region_name: Option<String>,

        /// Region identifier (TERYT code)
        #[arg(long)]
        region_id: Option<String>,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        breadth: Option<u32>,

        #[arg(long)]
        depth: Option<u32>,

        /// Fill region fields from this municipality
        #[arg(long)]
        municipality_id: Option<i64>,

        /// Open the monitor for the new task
        #[arg(long)]
        watch: bool,
    },
    /// Search municipalities interactively
    Search {
        query: Option<String>,

        /// Start a research task for the selected municipality
        #[arg(long)]
        create: bool,

        /// With --create, open the monitor for the new task
        #[arg(long, requires = "create")]
        watch: bool,
    },
    /// Show or update the global configuration
    Config {
        #[arg(long)]
        set_api_url: Option<String>,

        #[arg(long)]
        set_poll_secs: Option<u64>,

        #[arg(long, value_enum)]
        set_theme: Option<ThemeArg>,
    },
}

impl Command {
    /// Commands that take over the terminal
    fn is_interactive(&self) -> bool {
        match self {
            Command::Watch { .. } | Command::Search { .. } => true,
            Command::Create { watch, .. } => *watch,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ThemeArg {
    Dark,
    Light,
}

impl From<ThemeArg> for ThemeName {
    fn from(arg: ThemeArg) -> Self {
        match arg {
            ThemeArg::Dark => ThemeName::Dark,
            ThemeArg::Light => ThemeName::Light,
        }
    }
}

fn parse_status(raw: &str) -> Result<ResearchStatus, String> {
    let status = ResearchStatus::parse(raw);
    if ResearchStatus::filter_values().contains(&status) {
        Ok(status)
    } else {
        let known: Vec<String> = ResearchStatus::filter_values()
            .iter()
            .map(|s| s.as_str().to_string())
            .collect();
        Err(format!("unknown status '{}' (expected one of: {})", raw, known.join(", ")))
    }
}

fn init_logging(debug: bool, interactive: bool) -> anyhow::Result<()> {
    let level = match (debug, interactive) {
        (true, _) => "debug",
        (false, true) => "info",
        (false, false) => "warn",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);

    if interactive {
        // The TUI owns the terminal; log to a file instead
        let store = JsonStore::global()?;
        store.ensure_dir()?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(store.file_path(LOG_FILE))?;
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_logging(args.debug, args.command.is_interactive())?;

    let mut config = ConsoleConfig::load().unwrap_or_else(|e| {
        eprintln!("Warning: Failed to load config: {}", e);
        ConsoleConfig::default()
    });
    if let Some(url) = &args.api_url {
        config = config.with_api_base_url(url);
    }

    if let Command::Config {
        set_api_url,
        set_poll_secs,
        set_theme,
    } = &args.command
    {
        return update_config(config, set_api_url.clone(), *set_poll_secs, *set_theme);
    }

    if let Command::Watch {
        interval,
        stop_on_terminal,
        ..
    } = &args.command
    {
        if let Some(secs) = interval {
            config.poll_interval = Duration::from_secs(*secs);
        }
        config.stop_on_terminal |= *stop_on_terminal;
    }
    config.validate()?;

    let client = Arc::new(HttpClient::from_config(&config)?);
    let theme = Theme::from_name(config.theme);

    match args.command {
        Command::Watch { task_id, .. } => {
            tui::run_monitor(client, MonitorConfig::from(&config), theme, task_id).await?;
        }
        Command::Status { task_id, json } => {
            cli::show_status(&*client, &task_id, json).await?;
        }
        Command::Stop { task_id } => {
            cli::stop(&*client, &task_id).await?;
        }
        Command::Report { task_id } => {
            cli::show_report(&*client, &task_id).await?;
        }
        Command::List {
            status,
            region,
            municipality_id,
            page,
            per_page,
        } => {
            let options = ListOptions {
                status,
                region,
                municipality_id,
                page,
                per_page: per_page.unwrap_or(config.default_per_page),
            };
            cli::list(client, options).await?;
        }
        Command::Create {
            region_name,
            region_id,
            title,
            breadth,
            depth,
            municipality_id,
            watch,
        } => {
            let options = CreateOptions {
                region_name,
                region_id,
                title,
                breadth,
                depth,
                municipality_id,
            };
            let request = cli::build_request(&*client, options).await?;
            let record = cli::create(&*client, &request).await?;
            if watch {
                tui::run_monitor(client, MonitorConfig::from(&config), theme, record.task_id)
                    .await?;
            }
        }
        Command::Search {
            query,
            create,
            watch,
        } => {
            let picked =
                tui::run_search(client.clone(), SearchConfig::from(&config), theme, query).await?;
            let Some(municipality) = picked else {
                println!("No municipality selected");
                return Ok(());
            };
            cli::print_municipality(&municipality);

            if create {
                let request = region_client::CreateResearchRequest::for_municipality(&municipality);
                let record = cli::create(&*client, &request).await?;
                if watch {
                    tui::run_monitor(client, MonitorConfig::from(&config), theme, record.task_id)
                        .await?;
                }
            }
        }
        Command::Config { .. } => {}
    }

    Ok(())
}

/// Persist the given settings to the global config file and print the result
fn update_config(
    mut effective: ConsoleConfig,
    api_url: Option<String>,
    poll_secs: Option<u64>,
    theme: Option<ThemeArg>,
) -> anyhow::Result<()> {
    if api_url.is_some() || poll_secs.is_some() || theme.is_some() {
        let mut settings: ConsoleSettings = JsonStore::global()?
            .load_optional(CONSOLE_CONFIG_FILE)?
            .unwrap_or_default();

        if let Some(url) = api_url {
            effective = effective.with_api_base_url(&url);
            settings.api_base_url = Some(effective.api_base_url.clone());
        }
        if let Some(secs) = poll_secs {
            effective.poll_interval = Duration::from_secs(secs);
            settings.poll_interval_secs = Some(secs);
        }
        if let Some(theme) = theme {
            effective.theme = theme.into();
            settings.theme = Some(effective.theme);
        }

        effective.validate()?;
        ConsoleConfig::save_global(&settings)?;
        println!("Saved {}\n", JsonStore::global()?.file_path(CONSOLE_CONFIG_FILE).display());
    }

    cli::print_config(&effective);
    Ok(())
}
