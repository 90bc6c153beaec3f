use clap::Parser;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use sracurate::logging::{init_logging, LogConfig};
use sracurate::{
    AppConfig, AppEvent, Args, ConfigManager, DisplayView, EditEvent, FileFetcher,
    MetadataFetcher, Notification, NotificationLevel, Session, SessionSettings, APP_NAME,
};
use sracurate_cli::CellEditArg;
use tracing::debug;

/// Command-line values take precedence over the config file.
fn apply_args(config: &mut AppConfig, args: &Args) {
    if let Some(dir) = &args.out_dir {
        config.export.directory = Some(dir.clone());
    }
    if let Some(compression) = args.compression {
        config.export.compression = Some(compression.extension().to_string());
    }
    if let Some(n) = args.preview {
        config.export.preview_rows = n;
    }
    if let Some(path) = &args.mapping {
        config.catalog.mapping_path = Some(path.clone());
    }
    if let Some(path) = &args.field_catalog {
        config.catalog.field_catalog_path = Some(path.clone());
    }
    if args.detailed {
        config.fetch.detailed = true;
    }
}

fn build_fetcher(args: &Args, config: &AppConfig) -> Result<Box<dyn MetadataFetcher>> {
    if let Some(path) = &args.source {
        return Ok(Box::new(FileFetcher::new(path.clone())));
    }
    #[cfg(feature = "http")]
    {
        Ok(Box::new(config.fetch.ena_fetcher()))
    }
    #[cfg(not(feature = "http"))]
    {
        let _ = config;
        Err(eyre!(
            "Built without network support; use --source to read a downloaded report"
        ))
    }
}

/// Events for everything except the fetch and cell edits, in the order a
/// user working through the form would produce them.
fn curation_events(args: &Args) -> Vec<AppEvent> {
    let mut events = Vec::new();
    if !args.remove_column.is_empty() {
        events.push(AppEvent::RemoveColumns(args.remove_column.clone()));
    }
    for name in &args.add_column {
        events.push(AppEvent::AddColumn(name.clone()));
    }
    if args.inject {
        events.push(AppEvent::InjectFields(args.category.clone()));
    }
    for filter in &args.filter {
        events.push(AppEvent::SetColumnFilter(
            filter.column.clone(),
            filter.values.clone(),
        ));
    }
    if args.threshold_filter {
        events.push(AppEvent::SetThresholdFilter(true));
    }
    events
}

/// Resolve a named-column edit to a position in the current view.
fn edit_event(view: &DisplayView, edit: &CellEditArg) -> Option<EditEvent> {
    let column = view.columns().iter().position(|c| *c == edit.column)?;
    Some(EditEvent::new(edit.row, column, edit.value.as_str()))
}

fn report(notification: Option<Notification>) {
    let Some(n) = notification else {
        return;
    };
    match n.level {
        NotificationLevel::Error => eprintln!("Error: {}", n.message),
        NotificationLevel::Warning => eprintln!("Warning: {}", n.message),
        NotificationLevel::Info | NotificationLevel::Success => println!("{}", n.message),
    }
}

fn run(session: &mut Session, args: &Args, config: &AppConfig) -> Result<()> {
    let project_id = args
        .project_id
        .clone()
        .ok_or_else(|| eyre!("A project id is required"))?;

    let fetched = session.event(AppEvent::Fetch {
        project_id: project_id.clone(),
        detailed: config.fetch.detailed,
    });
    report(fetched);
    if session.project_id().is_none() {
        std::process::exit(1);
    }

    for event in curation_events(args) {
        debug!(?event, "applying");
        report(session.event(event));
    }

    for edit in &args.edit {
        match edit_event(session.view(), edit) {
            Some(event) => report(session.event(AppEvent::EditCell(event))),
            None => eprintln!("Warning: Edit ignored: unknown column \"{}\"", edit.column),
        }
    }

    for column in &args.list_values {
        println!("{}: {}", column, session.filter_choices(column).join(" | "));
    }

    if config.export.preview_rows > 0 {
        let preview = session
            .view()
            .head(session.master(), config.export.preview_rows)?;
        println!(
            "Showing {} of {} runs ({} total)",
            preview.height(),
            session.view().row_count(),
            session.master().row_count()
        );
        println!("{}", preview);
    }

    if !args.no_export {
        report(session.event(AppEvent::Export { directory: None }));
    }
    Ok(())
}

fn handle_early_exit_flags(args: &Args) -> Result<Option<()>> {
    if args.generate_config {
        match ConfigManager::new(APP_NAME) {
            Ok(config_manager) => match config_manager.write_default_config(args.force) {
                Ok(config_path) => {
                    println!("Configuration file written to: {}", config_path.display());
                    return Ok(Some(()));
                }
                Err(e) => {
                    eprintln!("Error writing configuration file: {}", e);
                    std::process::exit(1);
                }
            },
            Err(e) => {
                eprintln!("Error initializing config manager: {}", e);
                std::process::exit(1);
            }
        }
    }

    Ok(None)
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    if let Some(()) = handle_early_exit_flags(&args)? {
        return Ok(());
    }

    let mut config = AppConfig::load(APP_NAME)?;
    apply_args(&mut config, &args);
    config.validate()?;

    init_logging(LogConfig {
        filter: &config.logging.filter,
        verbose: args.verbose,
    })?;

    let (mapping, catalog) = config.catalog.load()?;
    let fetcher = build_fetcher(&args, &config)?;
    let settings = SessionSettings::from_config(&config, mapping, catalog);
    let mut session = Session::new(fetcher, settings);

    if let Err(e) = run(&mut session, &args, &config) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    Ok(())
}
