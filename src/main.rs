//! psort CLI - Tag a fork's patch set by category.

use clap::Parser;
use patch_sorter::cli::{Cli, Commands, ConfigCommands};
use patch_sorter::commands::{self, Output};
use patch_sorter::config::{ConfigOverrides, OutputFormat, ResolvedConfig, resolve_config};
use patch_sorter::logging;
use std::env;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

fn main() {
    let cli = Cli::parse();

    // The TUI owns the terminal and sets up file logging itself
    #[cfg(feature = "tui")]
    let logs_to_stderr = !matches!(cli.command, Some(Commands::Tui { .. }));
    #[cfg(not(feature = "tui"))]
    let logs_to_stderr = true;
    if logs_to_stderr {
        logging::init_logging(!cli.human_readable);
    }

    // Determine working directory: -C/--dir flag > PSORT_DIR env > cwd
    let work_dir = resolve_work_dir(cli.work_dir, cli.human_readable);

    let overrides = ConfigOverrides {
        patches_dir: cli.patches_dir,
        tags_file: cli.tags_file,
        editor: cli.editor,
        output_format: cli.human_readable.then_some(OutputFormat::Human),
    };
    let config = match resolve_config(&work_dir, &overrides) {
        Ok(config) => config,
        Err(e) => fail(&e.to_string(), None, cli.human_readable),
    };
    let human = *config.output_format() == OutputFormat::Human;
    tracing::debug!(work_dir = %work_dir.display(), patches_dir = %config.patches_dir().display(), "resolved config");

    if let Err(e) = run_command(cli.command, &config, &work_dir, human) {
        let hint = match e {
            patch_sorter::Error::PatchesDirMissing(_) => {
                Some("Run 'psort bootstrap' to fetch the patches, or pass --patches-dir")
            }
            _ => None,
        };
        fail(&e.to_string(), hint, human);
    }
}

/// Resolve the working directory from the explicit flag or the current directory.
///
/// An explicit path (via -C/--dir or PSORT_DIR) must exist.
fn resolve_work_dir(explicit_path: Option<PathBuf>, human: bool) -> PathBuf {
    match explicit_path {
        Some(path) => {
            if !path.is_dir() {
                fail(
                    &format!("Specified directory does not exist: {}", path.display()),
                    None,
                    human,
                );
            }
            path
        }
        None => env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Print an error and exit with status 1.
fn fail(message: &str, hint: Option<&str>, human: bool) -> ! {
    if human {
        eprintln!("Error: {}", message);
        if let Some(hint) = hint {
            eprintln!("{}", hint);
        }
    } else {
        let err = match hint {
            Some(hint) => serde_json::json!({ "error": message, "hint": hint }),
            None => serde_json::json!({ "error": message }),
        };
        eprintln!("{}", err);
    }
    process::exit(1);
}

fn run_command(
    command: Option<Commands>,
    config: &ResolvedConfig,
    work_dir: &Path,
    human: bool,
) -> Result<(), patch_sorter::Error> {
    match command {
        Some(Commands::List { filter }) => {
            let mut session = commands::open_session(config)?;
            output(&commands::list(&mut session, filter), human);
        }

        Some(Commands::Show { patch }) => {
            let session = commands::open_session(config)?;
            output(&commands::show(&session, &patch)?, human);
        }

        Some(Commands::Toggle { patch, category }) => {
            let mut session = commands::open_session(config)?;
            output(&commands::toggle(&mut session, &patch, category)?, human);
        }

        Some(Commands::Categories) => output(&commands::categories(), human),

        Some(Commands::Stats) => {
            let session = commands::open_session(config)?;
            output(&commands::stats(&session), human);
        }

        Some(Commands::Bootstrap { force }) => {
            let cancel = Arc::new(AtomicBool::new(false));
            let handler_flag = Arc::clone(&cancel);
            if let Err(e) = ctrlc::set_handler(move || handler_flag.store(true, Ordering::SeqCst)) {
                tracing::warn!(error = %e, "could not install Ctrl-C handler");
            }
            output(&commands::bootstrap(config, force, &cancel)?, human);
        }

        Some(Commands::Open { patch }) => {
            let session = commands::open_session(config)?;
            output(&commands::open(&session, &patch, config.editor())?, human);
        }

        Some(Commands::Config { command }) => match command {
            ConfigCommands::Show => output(&commands::config_show(config, work_dir), human),
            ConfigCommands::Init => output(&commands::config_init(work_dir)?, human),
        },

        #[cfg(feature = "tui")]
        Some(Commands::Tui { filter }) => patch_sorter::tui::run_tui(config, filter)?,

        None => {
            // Default: show tagging progress
            let session = commands::open_session(config)?;
            output(&commands::stats(&session), human);
        }
    }

    Ok(())
}

/// Print output in JSON or human-readable format.
fn output<T: Output>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}
