use anyhow::Result;
use std::io::{self, Write};
use std::sync::Arc;
use studio_core::backend::GenerationRequest;
use studio_core::catalog::{BackendId, Resolution};
use studio_session::{GenerationSession, SessionSnapshot};

use super::output::{display_ref, format_entry, ConsoleNotifier};

/// Per-REPL choices layered over the config defaults.
struct Prefs {
    backend: Option<BackendId>,
    resolution: Resolution,
}

pub async fn run(
    app: super::App,
    image: Option<String>,
    resume_session: Option<String>,
) -> Result<()> {
    println!("\x1b[1mstudio\x1b[0m v{}", env!("CARGO_PKG_VERSION"));
    println!("Type \x1b[33m/help\x1b[0m for commands, \x1b[33mCtrl-D\x1b[0m to exit.\n");

    let notifier = Arc::new(ConsoleNotifier::new(false));
    let session = match resume_session {
        Some(id) => {
            let json = app
                .db
                .snapshots()
                .load(&id, &app.config.user_id)
                .await
                .map_err(|e| anyhow::anyhow!("{e}"))?;
            let snapshot = SessionSnapshot::from_json(&json).map_err(|e| anyhow::anyhow!("{e}"))?;
            GenerationSession::restore(snapshot, app.account.clone(), notifier)
                .map_err(|e| anyhow::anyhow!("{e}"))?
        }
        None => app.new_session(image, notifier),
    };

    let mut prefs = Prefs {
        backend: None,
        resolution: app.config.generation.resolution,
    };

    println!("Session \x1b[90m{}\x1b[0m", session.id());
    show_current(&session);

    loop {
        eprint!("\x1b[32;1mstudio>\x1b[0m ");
        io::stderr().flush().ok();

        let mut input = String::new();
        match io::stdin().read_line(&mut input) {
            Ok(0) => {
                // EOF (Ctrl-D)
                println!();
                break;
            }
            Ok(_) => {}
            Err(e) => {
                eprintln!("Input error: {e}");
                break;
            }
        }

        let input = input.trim().to_string();
        if input.is_empty() {
            continue;
        }

        if input.starts_with('/') {
            match handle_command(&input, &app, &session, &mut prefs).await {
                Ok(true) => continue,
                Ok(false) => break,
                Err(e) => {
                    eprintln!("\x1b[31mCommand error: {e}\x1b[0m");
                    continue;
                }
            }
        }

        // Bare text edits the current image, or generates when there is none
        let editing = session.current_result().is_some();
        if let Err(e) = generate(&app, &session, &prefs, &input, editing).await {
            eprintln!("\x1b[31m{e}\x1b[0m");
        }
    }

    save(&app, &session).await?;
    println!("Session saved. Resume with \x1b[33mstudio edit --session {}\x1b[0m", session.id());
    Ok(())
}

async fn generate(
    app: &super::App,
    session: &GenerationSession,
    prefs: &Prefs,
    prompt: &str,
    editing: bool,
) -> Result<()> {
    let backend = app.backend(prefs.backend, editing)?;
    let info = backend.info();
    eprintln!("\x1b[90mGenerating with {}...\x1b[0m", info.display_name);

    let request = GenerationRequest::new(prompt).with_resolution(prefs.resolution);
    // Errors were already surfaced by the notifier
    if let Ok(result) = session.run(backend.as_ref(), request).await {
        let cost = info.cost(prefs.resolution).unwrap_or_default();
        app.record(session.id(), info.id, prompt, &result, cost).await;
        show_current(session);
    }
    Ok(())
}

fn show_current(session: &GenerationSession) {
    match session.current_result() {
        Some(r) => {
            let index = session.current_index().unwrap_or_default();
            let total = session.history().len();
            println!("[{}/{}] {}", index + 1, total, display_ref(&r));
        }
        None => println!("\x1b[90m(empty session: type a prompt to generate)\x1b[0m"),
    }
}

async fn save(app: &super::App, session: &GenerationSession) -> Result<()> {
    let json = session
        .snapshot()
        .to_json()
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    app.db
        .snapshots()
        .save(session.id(), &app.config.user_id, &json)
        .await
        .map_err(|e| anyhow::anyhow!("{e}"))
}

async fn handle_command(
    input: &str,
    app: &super::App,
    session: &GenerationSession,
    prefs: &mut Prefs,
) -> Result<bool> {
    let (cmd, arg) = match input.split_once(char::is_whitespace) {
        Some((c, a)) => (c, a.trim()),
        None => (input, ""),
    };

    match cmd {
        "/help" | "/h" => {
            println!("\x1b[1mCommands:\x1b[0m");
            println!("  <text>          Edit the current image (or generate if empty)");
            println!("  /gen <prompt>   Generate a new image from a prompt");
            println!("  /edit <prompt>  Edit the current image");
            println!("  /undo, /redo    Step through results");
            println!("  /show           Show the current result");
            println!("  /history        List results in this session");
            println!("  /credits        Show credit balance");
            println!("  /backend [id]   Show or pick the backend");
            println!("  /res [tier]     Show or set resolution (1k, 2k, 4k)");
            println!("  /save           Save the session for later");
            println!("  /exit           Save and exit");
            Ok(true)
        }
        "/exit" | "/quit" | "/q" => Ok(false),
        "/gen" | "/edit" => {
            if arg.is_empty() {
                anyhow::bail!("usage: {cmd} <prompt>");
            }
            generate(app, session, prefs, arg, cmd == "/edit").await?;
            Ok(true)
        }
        "/undo" | "/u" => {
            if session.undo().is_none() {
                println!("Nothing to undo.");
            }
            show_current(session);
            Ok(true)
        }
        "/redo" | "/r" => {
            if session.redo().is_none() {
                println!("Nothing to redo.");
            }
            show_current(session);
            Ok(true)
        }
        "/show" => {
            match session.current_result() {
                Some(r) => println!("{r}"),
                None => println!("No image yet."),
            }
            Ok(true)
        }
        "/history" => {
            let current = session.current_index();
            for (i, entry) in session.history().iter().enumerate() {
                println!("{}", format_entry(i, entry, Some(i) == current));
            }
            println!(
                "\x1b[90mundo: {} | redo: {}\x1b[0m",
                session.can_undo(),
                session.can_redo()
            );
            Ok(true)
        }
        "/credits" => {
            let credits = session.credits().await.map_err(|e| anyhow::anyhow!("{e}"))?;
            println!("Credits: \x1b[33m{credits}\x1b[0m");
            Ok(true)
        }
        "/backend" => {
            if arg.is_empty() {
                match prefs.backend {
                    Some(id) => println!("Backend: {id}"),
                    None => println!(
                        "Backend: auto (edit: {}, generate: {})",
                        app.config.generation.edit_backend, app.config.generation.generate_backend
                    ),
                }
            } else if arg == "auto" {
                prefs.backend = None;
                println!("Backend: auto");
            } else {
                let id: BackendId = arg.parse().map_err(|e: String| anyhow::anyhow!(e))?;
                prefs.backend = Some(id);
                println!("Backend: {id}");
            }
            Ok(true)
        }
        "/res" => {
            if !arg.is_empty() {
                prefs.resolution = arg.parse().map_err(|e: String| anyhow::anyhow!(e))?;
            }
            println!("Resolution: {}", prefs.resolution);
            Ok(true)
        }
        "/save" => {
            save(app, session).await?;
            println!("Saved session {}.", session.id());
            Ok(true)
        }
        _ => {
            eprintln!("Unknown command: {input}. Type /help for available commands.");
            Ok(true)
        }
    }
}
