//! `spark-demo` command-line driver

mod telemetry;

use anyhow::{anyhow, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use spark_demo::{AppConfig, DemoApp, UserPanelState};
use std::path::PathBuf;

fn cli() -> Command {
    Command::new("spark-demo")
        .version(spark_demo::VERSION)
        .about("Spark capability showcase: persisted notes, LLM prompts and user info")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .default_value("spark.toml")
                .value_parser(value_parser!(PathBuf))
                .help("Configuration file (defaults apply if it does not exist)"),
        )
        .arg(
            Arg::new("store")
                .long("store")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Override the key-value store file"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(
            Command::new("notes")
                .about("Manage saved notes")
                .subcommand_required(true)
                .subcommand(Command::new("list").about("List notes, oldest first"))
                .subcommand(
                    Command::new("add").about("Add a note").arg(
                        Arg::new("text")
                            .required(true)
                            .num_args(1..)
                            .help("Note text"),
                    ),
                )
                .subcommand(
                    Command::new("delete")
                        .about("Delete a note")
                        .arg(Arg::new("id").required(true).help("Note id")),
                ),
        )
        .subcommand(
            Command::new("ask")
                .about("Send a prompt to the completion service")
                .arg(
                    Arg::new("prompt")
                        .required(true)
                        .num_args(1..)
                        .help("Prompt text"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Ask for a JSON object and pretty-print it"),
                ),
        )
        .subcommand(Command::new("whoami").about("Show the signed-in user"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    telemetry::init(matches.get_flag("log-json"));

    let config = load_config(&matches)?;
    let app = DemoApp::new(&config).context("failed to start")?;

    let outcome = run(&app, &matches).await;
    app.shutdown().await;
    outcome
}

fn load_config(matches: &ArgMatches) -> Result<AppConfig> {
    let path = matches
        .get_one::<PathBuf>("config")
        .ok_or_else(|| anyhow!("missing --config"))?;
    let mut config = AppConfig::load(path)
        .with_context(|| format!("failed to load {}", path.display()))?;

    if let Some(store) = matches.get_one::<PathBuf>("store") {
        config = config.with_store_path(store.clone());
    }
    Ok(config)
}

async fn run(app: &DemoApp, matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("notes", args)) => notes(app, args).await,
        Some(("ask", args)) => ask(app, args).await,
        Some(("whoami", _)) => whoami(app).await,
        Some((other, _)) => Err(anyhow!("unknown command: {other}")),
        None => Err(anyhow!("no command given")),
    }
}

async fn notes(app: &DemoApp, matches: &ArgMatches) -> Result<()> {
    let board = app.notes();
    board.ready().await;

    match matches.subcommand() {
        Some(("list", _)) => {
            let notes = board.notes();
            if notes.is_empty() {
                println!("No notes yet. Add one with `spark-demo notes add <text>`.");
            }
            for note in notes.iter() {
                let created = note.created().map_or_else(
                    || "-".to_string(),
                    |at| at.format("%Y-%m-%d %H:%M").to_string(),
                );
                println!("{}  {}  {}", note.id, created, note.text);
            }
        }
        Some(("add", args)) => {
            let note = board.add_note(&joined(args, "text")?)?;
            println!("Saved note {}", note.id);
        }
        Some(("delete", args)) => {
            let id = args
                .get_one::<String>("id")
                .ok_or_else(|| anyhow!("missing note id"))?;
            if board.delete_note(id)? {
                println!("Deleted note {id}");
            } else {
                println!("No note with id {id}");
            }
        }
        _ => return Err(anyhow!("expected list, add or delete")),
    }
    Ok(())
}

async fn ask(app: &DemoApp, matches: &ArgMatches) -> Result<()> {
    let prompt = joined(matches, "prompt")?;
    let playground = app.playground();

    if matches.get_flag("json") {
        let value = playground.generate_json(&prompt).await?;
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("{}", playground.generate(&prompt).await?);
    }
    Ok(())
}

async fn whoami(app: &DemoApp) -> Result<()> {
    let panel = app.user_panel();
    match panel.load().await {
        UserPanelState::Loaded(user) => {
            println!("{} <{}>", user.login, user.email);
            println!("id: {}", user.id);
            println!("avatar: {}", user.avatar_url);
            if let Some(notice) = panel.owner_notice() {
                println!("{notice}");
            }
            Ok(())
        }
        UserPanelState::Failed | UserPanelState::Loading => {
            Err(anyhow!("could not determine the signed-in user"))
        }
    }
}

fn joined(matches: &ArgMatches, name: &str) -> Result<String> {
    let words: Vec<&str> = matches
        .get_many::<String>(name)
        .ok_or_else(|| anyhow!("missing {name}"))?
        .map(String::as_str)
        .collect();
    Ok(words.join(" "))
}
