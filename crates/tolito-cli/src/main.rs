use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use clap::Parser;
use cli::{Args, Commands};
use install::install_packages;
use logging::setup_logging;
use progress::{spawn_event_handler, ProgressGuard};
use query::{package_info, query_packages};
use remove::remove_packages;
use tolito_config::config::{self, generate_default_config, Config};
use tolito_core::{error::CoreError, CoreResult};
use tolito_dl::http_client::configure_http_client;
use tolito_events::{ChannelSink, EventSinkHandle, NullSink};
use tolito_operations::{clean::clean, OperationContext};
use tolito_utils::path::resolve_path;
use tracing::{info, warn};
use update::update_packages;
use utils::{set_color, TerminalPrompter};

mod cli;
mod install;
mod logging;
mod progress;
mod query;
mod remove;
mod update;
mod utils;

fn create_context(
    config: Config,
    args: &Args,
) -> CoreResult<(OperationContext, Option<ProgressGuard>)> {
    let prompter = Arc::new(TerminalPrompter);

    if args.json || args.quiet {
        let events: EventSinkHandle = Arc::new(NullSink);
        let ctx = OperationContext::new(config, events, prompter)?;
        return Ok((ctx, None));
    }

    let display = config.display();
    let (sink, receiver) = ChannelSink::new();
    let events: EventSinkHandle = Arc::new(sink);
    let ctx = OperationContext::new(config, events, prompter)?;
    let guard = spawn_event_handler(receiver, display);
    Ok((ctx, Some(guard)))
}

fn resolve_config_path(args: &Args) -> CoreResult<PathBuf> {
    match args.config {
        Some(ref path) => Ok(resolve_path(path)?),
        None => Ok(config::config_path()),
    }
}

fn print_config(path: &Path) -> CoreResult<()> {
    let content = match fs::read_to_string(path) {
        Ok(v) => v,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            warn!("Config file {} not found", path.display());
            Config::default_config()
                .to_annotated_document()?
                .to_string()
        }
        Err(err) => {
            return Err(CoreError::IoError {
                action: "reading config".to_string(),
                source: err,
            });
        }
    };
    info!("{content}");
    Ok(())
}

/// Runs the requested command. `Ok(true)` means some package ended in failure.
fn handle_cli() -> CoreResult<bool> {
    let args = Args::parse();

    setup_logging(&args);

    let config_path = resolve_config_path(&args)?;

    match args.command {
        Commands::DefConfig => {
            generate_default_config(&config_path)?;
            return Ok(false);
        }
        Commands::Config => {
            print_config(&config_path)?;
            return Ok(false);
        }
        _ => {}
    }

    let config = Config::load(&config_path)?;
    let display = config.display();
    set_color(display.color() && !args.no_color);

    if display.disable_timeout() {
        configure_http_client(|client| client.timeout = None);
    }

    let (ctx, progress_guard) = create_context(config, &args)?;

    let failed = match &args.command {
        Commands::Sync {
            repo_only,
            packages,
        } => install_packages(&ctx, packages, *repo_only),
        Commands::Remove { packages } => Ok(remove_packages(&ctx, packages)),
        Commands::Query { info, packages } => {
            if *info {
                package_info(&ctx, packages);
            } else {
                query_packages(&ctx, packages);
            }
            Ok(false)
        }
        Commands::Update { package } => update_packages(&ctx, package.as_deref()),
        Commands::Clean => clean(&ctx).map(|_| false),
        Commands::Config | Commands::DefConfig => Ok(false),
    };

    // the context owns the event sender; dropping it lets the render thread drain and exit
    drop(ctx);
    if let Some(guard) = progress_guard {
        guard.finish();
    }
    progress::stop();

    failed
}

fn main() -> miette::Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .build(),
        )
    }))
    .ok();

    if handle_cli().map_err(miette::Report::new)? {
        std::process::exit(1);
    }
    Ok(())
}
