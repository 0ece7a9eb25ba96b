//! `pacstrackctl`: storage checks, study searches and transfer tasks from the
//! command line.

mod render;

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand, ValueEnum};
use pacstrack_client::cache::{DiskCache, PersistenceCache, ViewCacheRoot};
use pacstrack_client::notify::{Notice, drain};
use pacstrack_client::pages::{
    STORAGE_PAGE, STUDIES_PAGE, forget_page, storage_views, studies_views,
};
use pacstrack_client::view::CategoryViews;
use pacstrack_client::{
    ApiClient, ApiService, DiscoveryPage, Notifier, ProgressIndicator, StudySearchPage, TaskBoard,
    TaskMonitor,
};
use pacstrack_config::ClientConfig;
use pacstrack_model::{Category, DateSelector, SearchField, TaskAction, fields, parse_form_date};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "pacstrackctl",
    about = "Track series missing from the PACS and the transfers that fix them"
)]
struct Cli {
    /// Storage server URL (overrides configuration)
    #[arg(long, global = true)]
    server: Option<String>,
    /// Directory for persisted views (overrides configuration)
    #[arg(long, global = true)]
    cache_dir: Option<std::path::PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List configured devices
    Devices {
        #[arg(long, value_enum, default_value = "storage")]
        page: PageArg,
    },
    /// Find series present on a device but missing from the PACS
    Discover {
        #[command(flatten)]
        range: RangeArgs,
    },
    /// Search a device for studies
    Search {
        #[command(flatten)]
        range: RangeArgs,
        /// Modality filter, repeatable
        #[arg(long = "modality")]
        modalities: Vec<String>,
        #[arg(long, value_enum)]
        field: Option<FieldArg>,
        #[arg(long)]
        value: Option<String>,
    },
    /// List the series of one study from the last search, optionally sending
    /// some of them
    Expand {
        /// Study row position as printed by `show studies`
        row: usize,
        /// Destination for the series picked with --rows
        #[arg(long, requires = "rows")]
        to: Option<String>,
        /// Series row positions as printed by this command
        #[arg(long, value_delimiter = ',')]
        rows: Vec<usize>,
    },
    /// Print the last results of a page from the local cache
    Show {
        #[arg(value_enum)]
        page: PageArg,
    },
    /// Transfer rows of the last results to a destination
    Send {
        #[arg(value_enum)]
        page: PageArg,
        /// Destination device, "PACS" or "Local"
        #[arg(long)]
        to: String,
        /// Row positions as printed by `show`
        #[arg(long, value_delimiter = ',', required = true)]
        rows: Vec<usize>,
    },
    /// Inspect and control transfer tasks
    Tasks {
        #[command(subcommand)]
        action: TasksCommand,
    },
    /// Manage the local view cache
    Cache {
        #[command(subcommand)]
        action: CacheCommand,
    },
}

#[derive(Subcommand)]
enum TasksCommand {
    /// Print the task table once
    List,
    /// Refresh the task table until interrupted
    Watch {
        /// Stop after this many refreshes
        #[arg(long)]
        count: Option<u64>,
    },
    /// Apply an action to tasks by row position
    Action {
        #[arg(value_enum)]
        action: ActionArg,
        #[arg(long, value_delimiter = ',', required = true)]
        rows: Vec<usize>,
    },
}

#[derive(Subcommand)]
enum CacheCommand {
    /// Forget the persisted results of every page
    Clear,
}

#[derive(Args)]
struct RangeArgs {
    /// Device to query; defaults to the last queried one
    #[arg(long)]
    device: Option<String>,
    #[arg(long, value_enum)]
    date: Option<DateArg>,
    /// YYYY-MM-DD
    #[arg(long)]
    start: Option<String>,
    /// YYYY-MM-DD
    #[arg(long)]
    end: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum PageArg {
    Storage,
    Studies,
}

#[derive(Clone, Copy, ValueEnum)]
enum DateArg {
    Anydate,
    Today,
    Yesterday,
    Day,
    Between,
}

impl From<DateArg> for DateSelector {
    fn from(value: DateArg) -> Self {
        match value {
            DateArg::Anydate => DateSelector::AnyDate,
            DateArg::Today => DateSelector::Today,
            DateArg::Yesterday => DateSelector::Yesterday,
            DateArg::Day => DateSelector::Day,
            DateArg::Between => DateSelector::Between,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum FieldArg {
    PatientName,
    PatientId,
    StudyDescription,
}

impl From<FieldArg> for SearchField {
    fn from(value: FieldArg) -> Self {
        match value {
            FieldArg::PatientName => SearchField::PatientName,
            FieldArg::PatientId => SearchField::PatientId,
            FieldArg::StudyDescription => SearchField::StudyDescription,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ActionArg {
    Pause,
    Continue,
    Retry,
    Rush,
    Delete,
}

impl From<ActionArg> for TaskAction {
    fn from(value: ActionArg) -> Self {
        match value {
            ActionArg::Pause => TaskAction::Pause,
            ActionArg::Continue => TaskAction::Continue,
            ActionArg::Retry => TaskAction::Retry,
            ActionArg::Rush => TaskAction::Rush,
            ActionArg::Delete => TaskAction::Delete,
        }
    }
}

/// Everything a command needs, built once from configuration.
struct Session {
    config: ClientConfig,
    api: Arc<dyn ApiService>,
    cache: Arc<dyn PersistenceCache>,
    notifier: Notifier,
    notices: UnboundedReceiver<Notice>,
}

impl Session {
    fn new(server: Option<String>, cache_dir: Option<std::path::PathBuf>) -> Result<Self> {
        let (mut config, source) = ClientConfig::load_from_env()?;
        if let Some(server) = server {
            config.server_url = server;
        }
        if cache_dir.is_some() {
            config.cache_dir = cache_dir;
        }
        config.validate()?;
        debug!(?source, server = %config.server_url, "configuration ready");

        let api = ApiClient::from_config(&config)?;
        let root = ViewCacheRoot::for_server(
            &config.normalized_server_url(),
            config.cache_dir.as_deref(),
        )?;
        let (notifier, notices) = Notifier::channel();

        Ok(Self {
            config,
            api: Arc::new(api),
            cache: Arc::new(DiskCache::new(root)),
            notifier,
            notices,
        })
    }

    async fn storage_page(&self) -> DiscoveryPage {
        DiscoveryPage::open(
            Arc::clone(&self.api),
            Arc::clone(&self.cache),
            self.notifier.clone(),
            self.config.progress_interval(),
        )
        .await
    }

    async fn studies_page(&self) -> StudySearchPage {
        StudySearchPage::open(
            Arc::clone(&self.api),
            Arc::clone(&self.cache),
            self.notifier.clone(),
        )
        .await
    }

    fn task_monitor(&self) -> TaskMonitor {
        TaskMonitor::new(
            Arc::clone(&self.api),
            TaskBoard::new(600.0, 24.0),
            self.config.task_refresh_delay(),
            self.notifier.clone(),
        )
    }

    fn flush_notices(&mut self) {
        for notice in drain(&mut self.notices) {
            eprintln!("{}", render::notice(&notice));
        }
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Form defaults overridden by whatever was given on the command line.
fn apply_range(
    range: RangeArgs,
    selector: &mut DateSelector,
    start: &mut NaiveDate,
    end: &mut NaiveDate,
    device: &mut String,
) -> Result<()> {
    if let Some(date) = range.date {
        *selector = date.into();
    }
    if let Some(raw) = range.start {
        *start = parse_form_date(&raw)?;
    }
    if let Some(raw) = range.end {
        *end = parse_form_date(&raw)?;
    }
    if let Some(name) = range.device {
        *device = name;
    }
    if device.is_empty() {
        bail!("no device given and none remembered; pass --device");
    }
    Ok(())
}

/// Print progress updates until the indicator goes idle or the receiver
/// closes.
fn follow_progress(progress: &ProgressIndicator) -> tokio::task::JoinHandle<()> {
    let mut rx = progress.subscribe();
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let progress = rx.borrow_and_update().clone();
            if progress.animated {
                eprintln!("{}", render::progress_line(&progress));
            }
        }
    })
}

const STORAGE_TABLES: &[(Category, &str)] = &[
    (Category::Primary, "Missing from PACS"),
    (Category::Ignored, "Filtered"),
    (Category::Archived, "Archived"),
];

const STUDY_TABLES: &[(Category, &str)] = &[(Category::Primary, "Studies")];

fn print_views(page: PageArg, views: &CategoryViews) {
    let (columns, tables) = match page {
        PageArg::Storage => (render::SERIES_COLUMNS, STORAGE_TABLES),
        PageArg::Studies => (render::STUDY_COLUMNS, STUDY_TABLES),
    };
    for &(category, title) in tables {
        if let Some(table) = views.view(category) {
            let badge = views.badge(category);
            println!("{}", render::table(title, badge, table, columns, render::no_marker));
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut ctx = Session::new(cli.server, cli.cache_dir)?;
    let result = execute(&ctx, cli.command).await;
    // Pages queue their error notices before the error surfaces here.
    ctx.flush_notices();
    result
}

async fn execute(ctx: &Session, command: Command) -> Result<()> {
    match command {
        Command::Devices { page } => {
            let picker = match page {
                PageArg::Storage => ctx.storage_page().await.load_devices().await?,
                PageArg::Studies => ctx.studies_page().await.load_devices().await?,
            };
            let selected = picker.selected().map(|d| d.name.clone());
            for device in picker.devices() {
                let mark = if Some(&device.name) == selected.as_ref() {
                    '*'
                } else {
                    ' '
                };
                println!(
                    "{mark} {:<16} {:<16} {:<22} series images: {}",
                    device.name,
                    device.ae_title,
                    device.address,
                    device.imgs_series.as_deref().unwrap_or("-")
                );
            }
            println!("destinations: {}", picker.destinations().join(", "));
            Ok(())
        }
        Command::Discover { range } => {
            let page = ctx.storage_page().await;
            // Loads the device list so unknown image counts are reported.
            page.load_devices().await?;
            let mut query = page.form_defaults(today());
            apply_range(
                range,
                &mut query.date_selector,
                &mut query.start_date,
                &mut query.end_date,
                &mut query.device,
            )?;

            let printer = follow_progress(page.progress());
            let outcome = page.find_missing(query).await;
            printer.abort();
            match outcome {
                Ok(summary) => {
                    info!(device = %summary.device, "storage check finished");
                    print_views(PageArg::Storage, &page.views().read());
                    Ok(())
                }
                Err(err) => Err(err.into()),
            }
        }
        Command::Search {
            range,
            modalities,
            field,
            value,
        } => {
            let page = ctx.studies_page().await;
            let mut query = page.form_defaults("", today());
            apply_range(
                range,
                &mut query.date_selector,
                &mut query.start_date,
                &mut query.end_date,
                &mut query.device,
            )?;
            if !modalities.is_empty() {
                query.modalities = modalities;
            }
            if let Some(field) = field {
                query.search_field = field.into();
            }
            if let Some(value) = value {
                query.search_value = value;
            }

            let found = page.search(query).await?;
            println!("{found} studies found");
            print_views(PageArg::Studies, &page.views().read());
            Ok(())
        }
        Command::Expand { row, to, rows } => {
            let page = ctx.studies_page().await;
            let count = page.expand_study(row).await?;
            let uid = page
                .views()
                .read()
                .view(Category::Primary)
                .and_then(|studies| studies.get(row))
                .and_then(|study| study.get_str(fields::STUDY_INSTANCE_UID))
                .map(str::to_string)
                .unwrap_or_default();
            if let Some(series) = page.series_view(&uid) {
                println!(
                    "{}",
                    render::table(
                        "Series",
                        count,
                        &series,
                        render::STUDY_SERIES_COLUMNS,
                        render::no_marker
                    )
                );
            }
            if let Some(to) = to {
                let selected = page.select_series(&uid, &rows);
                if selected < rows.len() {
                    bail!("only {selected} of {} series rows exist", rows.len());
                }
                let response = page.send_selected(&to).await?;
                println!("{}", response.message);
            }
            Ok(())
        }
        Command::Show { page } => {
            let views = match page {
                PageArg::Storage => ctx.storage_page().await.views(),
                PageArg::Studies => ctx.studies_page().await.views(),
            };
            print_views(page, &views.read());
            Ok(())
        }
        Command::Send { page, to, rows } => {
            let response = match page {
                PageArg::Storage => {
                    let page = ctx.storage_page().await;
                    page.select_rows(Category::Primary, &rows);
                    page.send_selected(&to).await?
                }
                PageArg::Studies => {
                    let page = ctx.studies_page().await;
                    page.select_rows(&rows);
                    page.send_selected(&to).await?
                }
            };
            println!("{}", response.message);
            Ok(())
        }
        Command::Tasks { action } => run_tasks(ctx, action).await,
        Command::Cache {
            action: CacheCommand::Clear,
        } => {
            forget_page(&*ctx.cache, STORAGE_PAGE, &storage_views().categories())
                .await
                .context("failed to clear storage views")?;
            forget_page(&*ctx.cache, STUDIES_PAGE, &studies_views().categories())
                .await
                .context("failed to clear study views")?;
            println!("view cache cleared");
            Ok(())
        }
    }
}

async fn run_tasks(ctx: &Session, command: TasksCommand) -> Result<()> {
    let monitor = ctx.task_monitor();
    let board = monitor.board();
    let print = || {
        let board = board.read();
        println!(
            "{}",
            render::table(
                "Tasks",
                board.table().len(),
                board.table(),
                render::TASK_COLUMNS,
                render::task_marker
            )
        );
    };

    match command {
        TasksCommand::List => {
            monitor.refresh().await?;
            print();
        }
        TasksCommand::Watch { count } => {
            let poller = monitor.start();
            let interrupted = tokio::signal::ctrl_c();
            tokio::pin!(interrupted);
            let mut printed = 0;
            let mut last_seen = 0;
            loop {
                tokio::select! {
                    _ = &mut interrupted => break,
                    _ = tokio::time::sleep(monitor.refresh_delay() / 4) => {}
                }
                let applied = poller.applied_ticks();
                if applied == last_seen {
                    continue;
                }
                last_seen = applied;
                print();
                printed += 1;
                if count.is_some_and(|limit| printed >= limit) {
                    break;
                }
            }
            poller.shutdown().await;
        }
        TasksCommand::Action { action, rows } => {
            monitor.refresh().await?;
            let selected = board.write().select_rows(&rows);
            if selected < rows.len() {
                bail!("only {selected} of {} rows exist", rows.len());
            }
            let action: TaskAction = action.into();
            let sent = monitor.apply_action(action).await?;
            println!("{action} sent for {sent} task(s)");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    run(Cli::parse()).await
}
