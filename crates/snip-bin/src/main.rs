use anyhow::{Context, Result};
use clap::Parser;
use core_config::load_from;
use core_engine::Session;
use core_events::parse_keys;
use core_registry::Registry;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Once;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;

const LOG_FILE: &str = "snipline.log";

#[derive(Parser, Debug)]
#[command(name = "snipline", version, about = "Expand snippets over scripted key input")]
struct Args {
    /// Snippet file to load (repeatable).
    #[arg(long = "snippets", required = true)]
    pub snippets: Vec<PathBuf>,
    /// Filetype the files are registered under; lookups also consult `all`.
    #[arg(long = "filetype", default_value = "all")]
    pub filetype: String,
    /// Keys in `<Tab>`/`<C-j>` notation.
    #[arg(long = "keys")]
    pub keys: String,
    /// Initial buffer content. The cursor starts at its end.
    #[arg(long = "text", default_value = "")]
    pub text: String,
    /// Optional configuration file path (overrides discovery of `snipline.toml`).
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
    /// Answers for ambiguous triggers, used in order as choices come up.
    #[arg(long = "choose")]
    pub choose: Vec<usize>,
}

fn configure_logging(log_dir: &Path) -> Option<WorkerGuard> {
    let log_path = log_dir.join(LOG_FILE);
    if log_path.exists() {
        let _ = std::fs::remove_file(&log_path);
    }

    let file_appender = tracing_appender::rolling::never(log_dir, LOG_FILE);
    let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
    match tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_ansi(false)
        .with_writer(nb_writer)
        .try_init()
    {
        Ok(()) => Some(guard),
        // A global subscriber is already installed; dropping the guard shuts the writer down.
        Err(_) => None,
    }
}

fn install_panic_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            tracing::error!(target: "runtime.panic", ?info, "panic");
            default_panic(info);
        }));
    });
}

fn load_registry(paths: &[PathBuf], filetype: &str) -> Result<Registry> {
    let mut registry = Registry::new();
    for path in paths {
        let diagnostics = registry
            .load_file(filetype, path)
            .with_context(|| format!("loading snippets for '{filetype}'"))?;
        for diagnostic in diagnostics {
            eprintln!("{diagnostic}");
        }
    }
    Ok(registry)
}

fn run(args: Args) -> Result<String> {
    let config = load_from(args.config.clone())?;
    let registry = load_registry(&args.snippets, &args.filetype)?;
    info!(
        target: "runtime.startup",
        files = args.snippets.len(),
        snippets = registry.len(),
        filetype = args.filetype.as_str(),
        config_override = args.config.is_some(),
        "bootstrap_complete"
    );

    let mut session = Session::with_text(&config, registry, &args.text)?;
    session
        .engine_mut()
        .set_filetypes(vec![args.filetype.clone()]);
    let mut answers: VecDeque<usize> = args.choose.into();
    let keys = parse_keys(&args.keys).context("parsing --keys")?;
    for key in &keys {
        session.key(key)?;
        if session.is_choosing()
            && let Some(choice) = answers.pop_front()
        {
            session.choose(choice)?;
        }
    }
    for diagnostic in session.take_diagnostics() {
        eprintln!("{diagnostic}");
    }
    info!(
        target: "runtime",
        keys = keys.len(),
        depth = session.engine().depth(),
        "session_finished"
    );
    Ok(session.text())
}

fn main() -> Result<()> {
    let _log_guard = configure_logging(Path::new("."));
    install_panic_hook();
    info!(target: "runtime", "startup");

    let text = run(Args::parse())?;
    println!("{text}");
    Ok(())
}
