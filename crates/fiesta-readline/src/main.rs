mod attachment;
mod commands;
mod helper;
mod render;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::Parser;
use colored::Colorize;
use rustyline::Editor;
use rustyline::history::DefaultHistory;
use tokio::sync::mpsc;

use fiesta_application::{RequestOrchestrator, TurnReport};
use fiesta_core::{FiestaError, ImagePayload, Prompt};
use fiesta_execution::init_tracing;
use fiesta_infrastructure::{ConfigStorage, FileCredentialProvider, FiestaPaths};

use crate::attachment::load_image;
use crate::commands::{Command, help_text};
use crate::helper::CliHelper;
use crate::render::{render_history, render_turn};

/// Send one prompt to several models and compare their replies.
#[derive(Debug, Parser)]
#[command(name = "fiesta", version, about)]
struct Args {
    /// Config file (defaults to ~/.config/fiesta/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Pane to open at startup; repeatable. Replaces the configured defaults.
    #[arg(short, long = "pane", value_name = "MODEL_ID")]
    panes: Vec<String>,

    /// Start with web search tagging on
    #[arg(long)]
    web_search: bool,

    /// Write the effective config to the config file and exit
    #[arg(long)]
    write_config: bool,
}

/// Result of one submission, delivered to the printer task.
enum TurnResult {
    Settled(TurnReport),
    Refused(FiestaError),
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // ===== Configuration =====
    let config_path = match args.config {
        Some(path) => path,
        None => FiestaPaths::config_file()?,
    };
    let storage = ConfigStorage::new(config_path.clone());
    let mut config = storage
        .load()
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    if args.write_config {
        storage.save(&config)?;
        println!("Wrote {}", storage.path().display());
        return Ok(());
    }
    if !args.panes.is_empty() {
        config.turns.default_panes = args.panes;
    }

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let logs_dir = FiestaPaths::logs_dir().ok();
    let _log_guard = init_tracing(&config.logging, logs_dir.as_deref(), Some(event_tx))?;

    if let Err(e) = FiestaPaths::ensure_secret_file() {
        tracing::warn!("[Fiesta] Could not create secret file template: {}", e);
    }

    // ===== Backend Initialization =====
    let credentials = Arc::new(FileCredentialProvider::load());
    let orchestrator = Arc::new(RequestOrchestrator::from_config(
        &config,
        credentials.clone(),
    )?);
    orchestrator.set_web_search(args.web_search);

    // Surface warnings while the prompt is idle
    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            if event.level == "WARN" || event.level == "ERROR" {
                println!("{}", format!("  ! {}", event.message).bright_black());
            }
        }
    });

    let (result_tx, mut result_rx) = mpsc::channel::<TurnResult>(16);
    let printer = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move {
            while let Some(result) = result_rx.recv().await {
                match result {
                    TurnResult::Settled(report) => {
                        let log = orchestrator.store().snapshot().await;
                        let code = orchestrator.code_slot().get();
                        print!(
                            "{}",
                            render_turn(&report, &log, &code, orchestrator.catalog())
                        );
                    }
                    TurnResult::Refused(err) => print_refusal(&err),
                }
            }
        })
    };

    // ===== REPL Setup =====
    let model_ids = orchestrator.catalog().iter().map(|m| m.id.clone()).collect();
    let mut rl: Editor<CliHelper, DefaultHistory> = Editor::new()?;
    rl.set_helper(Some(CliHelper::new(model_ids)));

    println!("{}", "=== Fiesta ===".bright_magenta().bold());
    println!(
        "{}",
        format!(
            "Active panes: {}. Type '/help' for commands, or 'quit' to exit.",
            orchestrator.panes().await.join(", ")
        )
        .bright_black()
    );
    println!();

    let mut pending_image: Option<ImagePayload> = None;

    // ===== Main REPL Loop =====
    loop {
        let prompt_marker = if pending_image.is_some() { "[img] >> " } else { ">> " };
        let readline = rl.readline(prompt_marker);

        match readline {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(&line);

                match Command::parse(trimmed) {
                    Command::Quit => {
                        println!("{}", "Goodbye!".bright_green());
                        break;
                    }
                    Command::Prompt(text) => {
                        let mut prompt = Prompt::new(text);
                        if let Some(image) = pending_image.take() {
                            prompt = prompt.with_image(image);
                        }
                        let orchestrator = orchestrator.clone();
                        let tx = result_tx.clone();
                        tokio::spawn(async move {
                            let result = match orchestrator.submit(prompt).await {
                                Ok(report) => TurnResult::Settled(report),
                                Err(err) => TurnResult::Refused(err),
                            };
                            let _ = tx.send(result).await;
                        });
                    }
                    Command::Add(model_id) => match orchestrator.add_pane(&model_id).await {
                        Ok(true) => println!("{}", format!("Opened {model_id}").green()),
                        Ok(false) => println!("{}", format!("{model_id} is already open").yellow()),
                        Err(e) => eprintln!("{}", e.to_string().red()),
                    },
                    Command::Remove(pane_id) => {
                        if orchestrator.remove_pane(&pane_id).await {
                            println!("{}", format!("Closed {pane_id}").green());
                        } else {
                            println!("{}", format!("{pane_id} is not open").yellow());
                        }
                    }
                    Command::Panes => {
                        for pane_id in orchestrator.panes().await {
                            println!("  {}", pane_id.bright_blue());
                        }
                    }
                    Command::History(pane_id) => {
                        let messages = orchestrator.store().pane_view(&pane_id).await;
                        println!("{}", render_history(&messages));
                    }
                    Command::Models => {
                        let active = orchestrator.panes().await;
                        for model in orchestrator.catalog().iter() {
                            let marker = if active.contains(&model.id) { "*" } else { " " };
                            println!(
                                "{} {:<18} {} ({:?}, {})",
                                marker,
                                model.id.bright_blue(),
                                model.display_name,
                                model.kind,
                                model.provider
                            );
                        }
                    }
                    Command::Web(setting) => {
                        let enabled = setting.unwrap_or(!orchestrator.web_search());
                        orchestrator.set_web_search(enabled);
                        println!(
                            "{}",
                            format!("Web search {}", if enabled { "on" } else { "off" }).green()
                        );
                    }
                    Command::Image(None) => {
                        pending_image = None;
                        println!("{}", "Attachment cleared".green());
                    }
                    Command::Image(Some(path)) => match load_image(&path) {
                        Ok(image) => {
                            println!(
                                "{}",
                                format!("Attached {} ({})", path.display(), image.mime_type).green()
                            );
                            pending_image = Some(image);
                        }
                        Err(e) => eprintln!("{}", format!("{e:#}").red()),
                    },
                    Command::Code => {
                        let code = orchestrator.code_slot().get();
                        if code.is_empty() {
                            println!("{}", "Code playground is empty".bright_black());
                        } else {
                            println!("{code}");
                        }
                    }
                    Command::Key { provider, key } => {
                        credentials.set(provider, key);
                        println!("{}", format!("{provider} key set for this session").green());
                    }
                    Command::Cancel => {
                        if !orchestrator.cancel().await {
                            println!("{}", "Nothing to cancel".bright_black());
                        }
                    }
                    Command::Help => println!("{}", help_text()),
                    Command::Usage(usage) => println!("{}", format!("Usage: {usage}").yellow()),
                    Command::Unknown(input) => {
                        println!("{}", format!("Unknown command: {input}").bright_black())
                    }
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                if orchestrator.cancel().await {
                    println!("{}", "Turn cancelled.".yellow());
                } else {
                    println!("{}", "CTRL-C detected. Type 'quit' to exit.".yellow());
                }
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        }
    }

    orchestrator.cancel().await;
    drop(result_tx);
    let _ = printer.await;

    Ok(())
}

fn print_refusal(err: &FiestaError) {
    eprintln!("{}", err.to_string().red());
    if let FiestaError::MissingCredential { .. } = err {
        let secret = FiestaPaths::secret_file()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| "secret.json".to_string());
        eprintln!(
            "{}",
            format!("Set it with '/key <gemini|openrouter> <api-key>' or in {secret}").yellow()
        );
    }
}
