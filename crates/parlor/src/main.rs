//! Chat with the configured assistants from the terminal.

#[macro_use]
extern crate tracing;

use std::io::Write as _;
use std::pin::pin;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use parlor::core::Snapshot;
use parlor::core::transcript::Transcript;
use parlor::{CliConfig, Input, Session, SessionBuilder};
use parlor_model::{Message, Role};
use tokio::io::{self, AsyncBufReadExt};
use tokio::select;
use tokio::sync::mpsc;
use tokio::time::sleep;

const BAR_CHAR: &str = "▎";

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = match CliConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            return;
        }
    };
    debug!("starting with {config:?}");

    let (message_tx, mut message_rx) = mpsc::unbounded_channel();
    let session = SessionBuilder::from_config(&config)
        .on_message(move |msg| {
            message_tx.send(msg.clone()).ok();
        })
        .on_export(|result| match result {
            Ok(path) => {
                let line = format!("📄 Documento exportado: {}", path.display());
                println!("{}", line.dimmed());
            }
            Err(err) => eprintln!("Falha ao exportar o documento: {err}"),
        })
        .build();

    let labels: Vec<_> = config.directory.labels().collect();
    println!("Assistentes: {}", labels.join(", "));
    println!("{}", "Digite /help para ver os comandos.".dimmed());
    // Show what is stored for the assistant the session starts with.
    if let Some(label) = config.directory.first_label() {
        if !run_input(&session, Input::Use(label.to_owned())).await {
            return;
        }
    }

    let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")
        .unwrap()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");

    loop {
        print!("> ");
        std::io::stdout().flush().ok();

        let Some(line) = read_line().await else {
            break;
        };
        let input = Input::parse(&line);
        match &input {
            Input::Quit => break,
            Input::Help => {
                println!("{}", Input::HELP);
                continue;
            }
            Input::List => {
                for label in config.directory.labels() {
                    println!("  {label}");
                }
                continue;
            }
            Input::Unknown(line) => {
                eprintln!("Comando desconhecido: {line}");
                continue;
            }
            Input::Turn(text) if text.is_empty() => continue,
            _ => {}
        }

        let mut task = pin!(run_input(&session, input));
        let mut progress_bar: Option<ProgressBar> = None;
        let alive = loop {
            select! {
                alive = &mut task => break alive,
                Some(msg) = message_rx.recv() => {
                    // Finish the progress bar before printing anything else.
                    if let Some(progress_bar) = progress_bar.take() {
                        progress_bar.finish_and_clear();
                    }
                    print_reply(&msg);
                }
                _ = sleep(Duration::from_millis(100)) => {
                    progress_bar
                        .get_or_insert_with(|| {
                            let progress_bar = ProgressBar::new_spinner();
                            progress_bar.set_style(progress_style.clone());
                            progress_bar.set_message("🤔 Pensando...");
                            progress_bar
                        })
                        .inc(1);
                }
            }
        };
        if let Some(progress_bar) = progress_bar.take() {
            progress_bar.finish_and_clear();
        }
        while let Ok(msg) = message_rx.try_recv() {
            print_reply(&msg);
        }
        if !alive {
            error!("the conversation manager has stopped");
            break;
        }
    }

    session.manager().shutdown();
}

/// Runs one command to completion. Returns `false` once the session is
/// gone.
async fn run_input(session: &Session, input: Input) -> bool {
    let manager = session.manager();
    match input {
        Input::Turn(text) => manager.send_user_turn(&text).await.is_ok(),
        Input::Start => manager.send_trigger().await.is_ok(),
        Input::Clear => {
            let cleared = manager.clear_active().await.is_ok();
            if cleared {
                println!("{}", "Conversa apagada.".dimmed());
            }
            cleared
        }
        Input::Use(label) => match manager.select_assistant(label).await {
            Ok(snapshot) => {
                print_header(&snapshot);
                for msg in &snapshot.messages {
                    print_message(msg);
                }
                true
            }
            Err(_) => false,
        },
        Input::List | Input::Help | Input::Quit | Input::Unknown(_) => true,
    }
}

fn print_header(snapshot: &Snapshot) {
    println!(
        "{}💬 {} ({} mensagens)",
        BAR_CHAR.bright_green(),
        snapshot.label.bright_white().bold(),
        snapshot.messages.len()
    );
}

/// Prints a message as it arrives. The user's own turns were just typed.
fn print_reply(msg: &Message) {
    if msg.role == Role::Assistant {
        print_message(msg);
    }
}

fn print_message(msg: &Message) {
    let text = msg.text().unwrap_or(Transcript::NON_TEXT_PLACEHOLDER);
    match msg.role {
        Role::User => {
            println!("{}🙂 {}", BAR_CHAR.bright_blue(), text.dimmed());
        }
        Role::Assistant => {
            println!("{}🤖 {}", BAR_CHAR.bright_cyan(), text.bright_white());
        }
    }
}

async fn read_line() -> Option<String> {
    let mut stdin = io::BufReader::new(io::stdin());
    let mut line = String::new();

    match stdin.read_line(&mut line).await {
        Ok(count) => {
            if count == 0 {
                return None;
            }
            Some(line)
        }
        Err(err) => {
            error!("error reading input: {}", err);
            None
        }
    }
}
