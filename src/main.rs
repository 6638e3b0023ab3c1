mod app;

use app::App;
use clap::Parser;
use modekeys::options::OptionValue;
use modekeys::{log, Config, InputSession, TextBuffer};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "modekeys", about = "Vim modal key interpreter playground")]
struct Args {
    /// Initial buffer contents.
    #[arg(long)]
    file: Option<PathBuf>,

    /// Run this key sequence (Vim notation) and print the result instead of
    /// starting the interactive editor.
    #[arg(long)]
    keys: Option<String>,

    #[arg(long)]
    log_level: Option<String>,

    /// Mapping timeout in milliseconds.
    #[arg(long)]
    timeoutlen: Option<u64>,
}

fn setup(args: &Args) -> Result<(InputSession, TextBuffer), String> {
    let cfg = Config::load();
    let mut session = InputSession::new();
    if let Err(e) = cfg.apply(&mut session) {
        eprintln!("warning: config: {e}");
    }

    if let Some(level) = &args.log_level {
        let level = log::parse_level(level).ok_or_else(|| format!("unknown log level '{level}'"))?;
        log::set_level(level);
    }
    if let Some(ms) = args.timeoutlen {
        let ms = i64::try_from(ms).map_err(|e| e.to_string())?;
        session
            .options_mut()
            .set("timeoutlen", OptionValue::Number(ms))
            .map_err(|e| e.to_string())?;
    }

    let text = match &args.file {
        Some(path) => std::fs::read_to_string(path).map_err(|e| format!("{}: {e}", path.display()))?,
        None => String::new(),
    };
    Ok((session, TextBuffer::new(text)))
}

/// Types `keys`, flushing any ambiguous prefix as if the timeout expired.
fn run_script(session: &mut InputSession, editor: &mut TextBuffer, keys: &str) -> Result<(), String> {
    let mut pending = session.feed_keys(editor, keys).map_err(|e| e.to_string())?;
    while let Some(ticket) = pending {
        pending = session.on_timeout(editor, ticket.generation);
    }
    print!("{}", editor.as_str());
    if !editor.as_str().ends_with('\n') {
        println!();
    }
    println!("-- mode: {}", session.modes().vim_notation());
    if let Some(err) = session.last_error() {
        println!("-- error: {err}");
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let (mut session, mut editor) = match setup(&args) {
        Ok(parts) => parts,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    if let Some(keys) = &args.keys {
        if let Err(e) = run_script(&mut session, &mut editor, keys) {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
        return;
    }

    let mut app = App::new(session, editor);
    if let Err(e) = app.run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
