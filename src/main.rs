mod cli;

use ripvault::{
    app, config,
    config::{Config, DeviceSourceKind},
    drive::{device::DeviceEventSource, udev::UdevEventSource},
    metadata, migrate,
    processor::DiscProcessor,
    workflow::{index_of, WorkflowEvent},
};
use ripvault_mkv::{tool_path_or_name, RipEngine};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;
use std::sync::Arc;

async fn start_service(config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    tracing::info!("Starting ripvault on {}", config.drive.device);

    let drive = app::drive_manager(&config, app::rip_engine(&config));
    let workflows = app::workflow_manager(&config, Arc::clone(&drive))?;
    let recovered = workflows.recover()?;
    if recovered > 0 {
        tracing::warn!("Reset {} workflows interrupted by the last run", recovered);
    }
    let provider = metadata::from_config(&config.omdb)?;
    if provider.is_none() {
        tracing::info!("No OMDb API key configured; names must be confirmed by hand");
    }
    let processor = Arc::new(DiscProcessor::new(
        Arc::clone(&workflows),
        provider,
        config.drive.auto_rip,
    ));

    // Log activity for anyone tailing the output.
    let mut events = workflows.subscribe();
    let event_logger = tokio::spawn(async move {
        use tokio::sync::broadcast::error::RecvError;
        loop {
            match events.recv().await {
                Ok(WorkflowEvent::RipProgress { key, progress }) => {
                    tracing::debug!("{} {} {:.0}%", key, progress.title, progress.fraction() * 100.0);
                }
                Ok(WorkflowEvent::StatusChanged { key, status }) => {
                    tracing::info!("{} is {}", key, status);
                }
                Ok(WorkflowEvent::IngestFinished { key, target, error }) => match error {
                    None => tracing::info!("{} archived to {}", key, target),
                    Some(e) => tracing::warn!("{} failed to archive to {}: {}", key, target, e),
                },
                Err(RecvError::Lagged(n)) => tracing::debug!("Event logger skipped {} events", n),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut source: Option<Box<dyn DeviceEventSource>> = match config.drive.source {
        DeviceSourceKind::Udev => {
            let udevadm = tool_path_or_name("udevadm", config.tools.udevadm.as_deref());
            Some(Box::new(UdevEventSource::new(udevadm, config.drive.device.clone())))
        }
        DeviceSourceKind::None => {
            tracing::warn!("Device events disabled; discs will not be detected");
            None
        }
    };
    let listener = match source.as_mut() {
        Some(source) => Some(drive.listen(source.start()?, processor)),
        None => None,
    };

    let resumed = workflows.resume_pending();
    if !resumed.is_empty() {
        tracing::info!("Resumed {} pending ingests", resumed.len());
    }

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    tracing::info!("Shutting down...");
    drop(source);
    if let Some(listener) = listener {
        listener.abort();
    }
    event_logger.abort();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "ripvault=trace,ripvault_mkv=trace,ripvault_db=debug,ripvault_common=debug,info".to_string()
        } else {
            "ripvault=debug,ripvault_mkv=info,ripvault_db=info,info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Start => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_service(cli.config.as_deref()))
        }
        Commands::Info { json } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(disc_info(cli.config.as_deref(), json))
        }
        Commands::List { json } => list_workflows(cli.config.as_deref(), json),
        Commands::Confirm {
            disc,
            title,
            name,
            year,
            imdb_id,
        } => confirm(cli.config.as_deref(), &disc, title, name, year, imdb_id),
        Commands::Ingest { disc, title } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(retry_ingest(cli.config.as_deref(), &disc, title))
        }
        Commands::Migrate => migrate_stores(cli.config.as_deref()),
        Commands::CheckTools => check_tools(),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("ripvault {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn disc_info(config_path: Option<&Path>, json: bool) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let engine = app::rip_engine(&config);
    let info = engine
        .scan(&config.drive.device)
        .await
        .with_context(|| format!("Failed to scan {}", config.drive.device))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("Disc: {} ({})", info.name, info.volume_name);
    if let Some(name) = info.guess_name() {
        println!("Guessed name: {}", name);
    }
    let main = info.main_title().map(|t| t.id);
    println!("\nTitles: {}", info.titles.len());
    for title in &info.titles {
        let marker = if Some(title.id) == main { "*" } else { " " };
        print!(
            "{} [{}] {} {} {} chapters",
            marker, title.id, title.name, title.duration, title.chapter_count
        );
        if let Some(resolution) = title.resolution() {
            print!(" {}", resolution);
        }
        if !title.source_file_name.is_empty() {
            print!(" ({})", title.source_file_name);
        }
        println!();
    }
    Ok(())
}

fn list_workflows(config_path: Option<&Path>, json: bool) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let stores = app::open_stores(&config)?;
    let workflows = stores.workflows.load()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&workflows)?);
        return Ok(());
    }

    if workflows.is_empty() {
        println!("No workflows");
        return Ok(());
    }
    for wf in &workflows {
        let name = match wf.confirmed_name() {
            Some((name, year)) => format!("{} ({})", name, year),
            None => format!("{:?} (unconfirmed)", wf.original_name),
        };
        println!(
            "{:<40} {:>3}  {:<10} {}",
            wf.disc_id,
            wf.title_id,
            wf.status.to_string(),
            name
        );
        for (target, outcome) in &wf.ingest {
            println!("{:>46}  {} {:?}", "", target, outcome);
        }
    }
    Ok(())
}

fn confirm(
    config_path: Option<&Path>,
    disc: &str,
    title: u32,
    name: String,
    year: String,
    imdb_id: Option<String>,
) -> Result<()> {
    if name.trim().is_empty() || year.trim().is_empty() {
        anyhow::bail!("Name and year must not be empty");
    }
    let config = config::load_config_or_default(config_path)?;
    let stores = app::open_stores(&config)?;
    let workflows = stores.workflows.load()?;
    let mut index = index_of(workflows);

    let wf = index
        .get_mut(disc)
        .and_then(|titles| titles.get_mut(&title))
        .with_context(|| format!("No workflow for {}/{}", disc, title))?;
    wf.name = Some(name);
    wf.year = Some(year);
    if imdb_id.is_some() {
        wf.imdb_id = imdb_id;
    }
    let wf = wf.clone();
    stores.workflows.persist(&wf, &index)?;

    println!(
        "Confirmed {}/{} as {} ({})",
        disc,
        title,
        wf.name.unwrap_or_default(),
        wf.year.unwrap_or_default()
    );
    Ok(())
}

async fn retry_ingest(config_path: Option<&Path>, disc: &str, title: u32) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let drive = app::drive_manager(&config, app::rip_engine(&config));
    let workflows = app::workflow_manager(&config, drive)?;

    let wf = workflows
        .get_workflow(disc, title)
        .with_context(|| format!("No workflow for {}/{}", disc, title))?;
    workflows.ingest(&wf).await?;
    println!("Archived {}/{}", disc, title);
    Ok(())
}

fn migrate_stores(config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let pool = app::open_pool(&config)?;
    let report = migrate::migrate_json_to_sqlite(&config.data_dir, &pool)?;
    println!(
        "Migrated {} discs and {} workflows",
        report.discs, report.workflows
    );
    Ok(())
}

fn check_tools() -> Result<()> {
    println!("Checking external tools...\n");

    let tools = ripvault_mkv::check_tools();
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version.lines().next().unwrap_or(""));
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Install them to enable all features.");
    }

    Ok(())
}

fn print_summary(config: &Config) {
    println!("  Device: {}", config.drive.device);
    println!("  Store: {:?} in {:?}", config.store, config.data_dir);
    println!("  Rip directory: {:?}", config.rip_dir);
    println!("  Auto rip: {}", config.drive.auto_rip);
    println!("  Metadata lookup: {}", !config.omdb.api_key.is_empty());
    println!("  Targets: {}", config.targets.len());
    for target in &config.targets {
        println!("    {}", target);
    }
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            print_summary(&config);
        }
        None => {
            println!("No config file specified, using defaults");
            println!("Default config:");
            print_summary(&Config::default());
        }
    }

    Ok(())
}
