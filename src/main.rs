use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use futures::future::join_all;
use ratatui::DefaultTerminal;
use tracing::{error, info, warn};

use kvpanel::config::{Settings, expand_path};
use kvpanel::controller::Controller;
use kvpanel::domain::PanelError;
use kvpanel::logging;
use kvpanel::memory_store::{InMemoryStore, TableSeed};
use kvpanel::model::{Model, Status};
use kvpanel::repository::Repository;
use kvpanel::ui::TableUI;
use kvpanel::view::TableView;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "A tui admin panel that lists, selects, and bulk-deletes rows of key-value tables"
)]
struct Cli {
    #[arg(
        short,
        long,
        env = "KVPANEL_CONFIG",
        default_value = "kvpanel.toml",
        value_name = "PATH",
        help = "Configuration file listing the tables to show"
    )]
    config: PathBuf,

    #[arg(
        short,
        long,
        env = "KVPANEL_LOG",
        value_name = "PATH",
        help = "Write logs to this file (the terminal is used by the UI)"
    )]
    log_file: Option<PathBuf>,

    #[arg(long, value_name = "MS", help = "Override the event poll time of the config file")]
    event_poll_time: Option<u64>,

    #[arg(long, value_name = "N", help = "Override the maximum column width of the config file")]
    max_column_width: Option<usize>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Err(e) => {
            error!("{e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

/// Build one repository per configured table on top of the local store.
fn build_repositories(settings: &Settings) -> Result<Vec<Repository>, PanelError> {
    let store = Arc::new(InMemoryStore::new(settings.store.scan_page_size));
    let mut repositories = Vec::with_capacity(settings.tables.len());
    for table in settings.tables.iter() {
        match &table.seed {
            Some(path) => {
                store.seed_table(&table.table_name, TableSeed::load(path)?)?;
                info!(
                    "Seeded {} with {} rows from {}",
                    table.table_name,
                    store.len(&table.table_name),
                    path.display()
                );
            }
            None => warn!(
                "No seed for table {} in {}, it will show up empty",
                table.table_name, table.region
            ),
        }
        repositories.push(Repository::new(table.table_name.clone(), store.clone()));
    }
    Ok(repositories)
}

async fn run(cli: Cli) -> Result<(), PanelError> {
    logging::init(cli.log_file.as_deref().map(expand_path).as_deref())?;
    info!("Starting kvpanel!");

    let mut settings = Settings::load(&expand_path(&cli.config))?;
    if let Some(poll_time) = cli.event_poll_time {
        settings.ui = settings.ui.with_event_poll_time(poll_time);
    }
    if let Some(width) = cli.max_column_width {
        settings.ui = settings.ui.with_max_column_width(width);
    }
    let mut repositories = build_repositories(&settings)?;
    join_all(repositories.iter_mut().map(|repo| repo.initialize())).await;

    let views: Vec<TableView> = repositories.into_iter().map(TableView::new).collect();

    let mut terminal = ratatui::init();
    let result = event_loop(&mut terminal, &settings, views).await;
    ratatui::restore();
    info!("Bye!");
    result
}

async fn event_loop(
    terminal: &mut DefaultTerminal,
    settings: &Settings,
    views: Vec<TableView>,
) -> Result<(), PanelError> {
    let size = terminal.size()?;
    let mut model = Model::init(
        &settings.ui,
        views,
        size.width as usize,
        size.height as usize,
    )?;
    let mut ui = TableUI::new();
    let controller = Controller::new(&settings.ui);

    while model.status != Status::QUITTING {
        // Render the current view
        terminal.draw(|f| ui.draw(&model, f))?;

        // Handle events and map to a Message
        let message = controller.handle_event()?;
        model.update(message).await?;
    }
    Ok(())
}
