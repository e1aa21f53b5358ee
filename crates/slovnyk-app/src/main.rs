//! Slovnyk -- terminal client for the remote dictionary server.
//!
//! Usage:
//!   slovnyk translate cat             # Look a word up
//!   slovnyk random                    # Word of the day
//!   slovnyk history --limit 10        # Recent lookups
//!   slovnyk format < raw.txt          # Format a definition offline
//!   slovnyk shell                     # Interactive session

use std::fs::OpenOptions;
use std::io::{self, BufRead, IsTerminal, Read, Write};
use std::sync::Mutex;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use slovnyk_app::config::AppConfig;
use slovnyk_app::session::{Outcome, Session, WriteResult};
use slovnyk_app::sink::AnsiSink;
use slovnyk_app::{expand_tilde, open_session};
use slovnyk_client::ClientConfig;
use slovnyk_format::{classify_lines, extract_clean_translation, format_definition, render_interactive};

#[derive(Parser)]
#[command(name = "slovnyk", about = "English-Ukrainian dictionary client")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "~/.slovnyk/config.toml")]
    config: String,

    /// Server host, overrides config and the remembered endpoint
    #[arg(long)]
    host: Option<String>,

    /// Server port
    #[arg(long)]
    port: Option<u16>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Translate a word
    Translate { word: String },
    /// Add a Ukrainian/English pair
    Add { ukrainian: String, english: String },
    /// Add a word with a full definition
    AddWord { word: String, definition: String },
    /// Delete a headword
    Delete { headword: String },
    /// Replace the definition of a headword
    Update { headword: String, definition: String },
    /// Fetch a random word
    Random,
    /// Show or edit search history
    History {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
        /// Remove one word from history
        #[arg(long)]
        remove: Option<String>,
        /// Remove everything
        #[arg(long)]
        clear: bool,
    },
    /// Manage favorites
    Favorites {
        #[command(subcommand)]
        action: Option<FavoritesAction>,
    },
    /// Read or write a stored setting
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Format a raw definition read from stdin
    Format {
        /// Headword substituted for `~`
        #[arg(long)]
        headword: Option<String>,
        /// Plain text for copying, no header markers
        #[arg(long)]
        export: bool,
    },
    /// Interactive session (default)
    Shell,
}

#[derive(Subcommand)]
enum FavoritesAction {
    /// List favorites (default)
    List,
    Add { word: String, translation: String },
    Remove { word: String },
}

#[derive(Subcommand)]
enum SettingsAction {
    Get { key: String },
    Set { key: String, value: String },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = expand_tilde(&cli.config);
    let cfg = AppConfig::load_or_default(&config_path)?;
    init_tracing(&cfg)?;

    let output = Output {
        json: cli.json,
        color: io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none(),
        tag_color: cfg.display.tag_color.clone(),
    };

    if let Some(Commands::Format { headword, export }) = &cli.command {
        let mut raw = String::new();
        io::stdin().read_to_string(&mut raw)?;
        let formatted = format_definition(raw.trim_end_matches(['\r', '\n']), headword.as_deref());
        if output.json {
            println!("{}", serde_json::to_string_pretty(&classify_lines(&formatted))?);
        } else if *export {
            println!("{}", extract_clean_translation(&formatted, headword.as_deref()));
        } else {
            println!("{}", output.styled(&formatted));
        }
        return Ok(());
    }

    let mut session = open_session(&cfg, cli.host.clone(), cli.port)?;
    let budget = request_budget(session.client().config());
    let result = run(&mut session, cli.command, &output, budget);
    session.shutdown();
    result
}

fn init_tracing(cfg: &AppConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "slovnyk=info,slovnyk_app=info,slovnyk_client=info".into());

    let file_layer = match &cfg.logging.file {
        Some(path) => {
            let path = expand_tilde(path);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(&path)?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .init();
    Ok(())
}

/// Upper bound on one request: every attempt timing out plus the backoff
/// between attempts, with a second of slack.
fn request_budget(config: &ClientConfig) -> Duration {
    let waits: Duration = (1..config.max_attempts).map(|retry| config.backoff(retry)).sum();
    config.timeout * config.max_attempts + waits + Duration::from_secs(1)
}

fn run(
    session: &mut Session,
    command: Option<Commands>,
    output: &Output,
    budget: Duration,
) -> anyhow::Result<()> {
    match command.unwrap_or(Commands::Shell) {
        Commands::Translate { word } => {
            if !session.translate(&word) {
                anyhow::bail!("nothing to translate");
            }
            finish(session, output, budget)
        }
        Commands::Add { ukrainian, english } => {
            if !session.add(&ukrainian, &english) {
                anyhow::bail!("both words are required");
            }
            finish(session, output, budget)
        }
        Commands::AddWord { word, definition } => {
            if !session.add_word(&word, &definition) {
                anyhow::bail!("word and definition are required");
            }
            finish(session, output, budget)
        }
        Commands::Delete { headword } => {
            if !session.delete(&headword) {
                anyhow::bail!("headword is required");
            }
            finish(session, output, budget)
        }
        Commands::Update {
            headword,
            definition,
        } => {
            if !session.update(&headword, &definition) {
                anyhow::bail!("headword and definition are required");
            }
            finish(session, output, budget)
        }
        Commands::Random => {
            session.random();
            finish(session, output, budget)
        }
        Commands::History {
            limit,
            remove,
            clear,
        } => {
            let store = session.store();
            if clear {
                store.clear_history();
            } else if let Some(word) = remove {
                if !store.remove_history(&word) {
                    eprintln!("{word} is not in history");
                }
            }
            let entries = store.get_history(limit);
            if output.json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                for entry in entries {
                    println!("{}  {}", entry.searched_at, entry.word);
                }
            }
            Ok(())
        }
        Commands::Favorites { action } => {
            let store = session.store();
            match action.unwrap_or(FavoritesAction::List) {
                FavoritesAction::List => {}
                FavoritesAction::Add { word, translation } => {
                    if !store.add_favorite(&word, &translation) {
                        eprintln!("{word} is already a favorite");
                    }
                }
                FavoritesAction::Remove { word } => {
                    if !store.remove_favorite(&word) {
                        eprintln!("{word} is not a favorite");
                    }
                }
            }
            let entries = store.get_favorite_entries();
            if output.json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                for entry in entries {
                    println!("{}", entry.word);
                    println!("{}", output.styled(&format_definition(&entry.translation, Some(&entry.word))));
                    println!();
                }
            }
            Ok(())
        }
        Commands::Settings { action } => {
            let store = session.store();
            match action {
                SettingsAction::Get { key } => println!("{}", store.get_setting(&key, "")),
                SettingsAction::Set { key, value } => {
                    if !store.set_setting(&key, &value) {
                        anyhow::bail!("failed to store {key}");
                    }
                }
            }
            Ok(())
        }
        Commands::Shell => shell(session, output, budget),
        Commands::Format { .. } => Ok(()),
    }
}

/// Wait for the single launched request and print what came of it.
fn finish(session: &mut Session, output: &Output, budget: Duration) -> anyhow::Result<()> {
    let outcomes = session.drain(budget);
    if outcomes.is_empty() {
        anyhow::bail!("no reply within {}s", budget.as_secs());
    }
    for outcome in &outcomes {
        output.print(outcome)?;
    }
    Ok(())
}

const SHELL_HELP: &str = "\
  <word>                     translate
  :add <ukrainian> <english>  add a pair
  :delete <headword>          delete an entry
  :random                     word of the day
  :fav                        toggle favorite for the last translation
  :history                    recent lookups
  :connect <host> <port>      switch server
  :quit";

fn shell(session: &mut Session, output: &Output, budget: Duration) -> anyhow::Result<()> {
    session.connect();
    session.random();
    for outcome in session.drain(budget) {
        output.print(&outcome)?;
    }

    let mut last: Option<(String, String)> = None;
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let Some(line) = lines.next() else { break };
        let line = line?;
        let mut parts = line.split_whitespace();
        match parts.next() {
            None => continue,
            Some(":quit") | Some(":q") => break,
            Some(":help") => println!("{SHELL_HELP}"),
            Some(":random") => session.random(),
            Some(":history") => {
                for word in session.store().get_history_words(20) {
                    println!("{word}");
                }
            }
            Some(":fav") => match &last {
                Some((word, definition)) => {
                    let now = session.toggle_favorite(word, definition);
                    println!("{word}: {}", if now { "favorite" } else { "not favorite" });
                }
                None => println!("translate something first"),
            },
            Some(":add") => match (parts.next(), parts.next()) {
                (Some(uk), Some(en)) => {
                    session.add(uk, en);
                }
                _ => println!("usage: :add <ukrainian> <english>"),
            },
            Some(":delete") => match parts.next() {
                Some(headword) => {
                    session.delete(headword);
                }
                None => println!("usage: :delete <headword>"),
            },
            Some(":connect") => match (parts.next(), parts.next().map(str::parse::<u16>)) {
                (Some(host), Some(Ok(port))) => session.connect_to(host, port),
                _ => println!("usage: :connect <host> <port>"),
            },
            Some(cmd) if cmd.starts_with(':') => println!("unknown command {cmd}, try :help"),
            Some(_) => {
                session.translate(&line);
            }
        }

        for outcome in session.drain(budget) {
            if let Outcome::Translation(t) = &outcome {
                last = Some((t.headword.clone(), t.definition.clone()));
            }
            output.print(&outcome)?;
        }
    }
    Ok(())
}

struct Output {
    json: bool,
    color: bool,
    tag_color: String,
}

impl Output {
    fn styled(&self, formatted: &str) -> String {
        let mut sink = if self.color {
            AnsiSink::new()
        } else {
            AnsiSink::plain()
        };
        render_interactive(&mut sink, formatted, &self.tag_color);
        sink.into_string().trim_end().to_string()
    }

    fn print(&self, outcome: &Outcome) -> anyhow::Result<()> {
        if self.json {
            println!("{}", serde_json::to_string(outcome)?);
            return Ok(());
        }
        match outcome {
            Outcome::Connected { host, port } => println!("connected to {host}:{port}"),
            Outcome::ConnectFailed { host, port } => println!("cannot reach {host}:{port}"),
            Outcome::Translation(t) => {
                let star = if t.favorite { " *" } else { "" };
                println!("{}{star}", t.headword);
                println!("{}", self.styled(&t.formatted));
                if !t.badges.is_empty() {
                    println!("({})", t.badges.join(", "));
                }
            }
            Outcome::NotFound { word } => println!("{word}: not found"),
            Outcome::NoResponse { verb, word } => {
                println!("{verb} {word}: no response from server")
            }
            Outcome::Write { verb, word, result } => {
                let text = match result {
                    WriteResult::Done { .. } => "done".to_string(),
                    WriteResult::Duplicate { .. } => "already exists".to_string(),
                    WriteResult::Rejected { detail } => {
                        format!("rejected ({})", detail.as_deref().unwrap_or("no detail"))
                    }
                    WriteResult::NoResponse => "no response from server".to_string(),
                };
                println!("{verb} {word}: {text}");
            }
            Outcome::WordOfDay {
                headword,
                formatted,
                ..
            } => {
                println!("Word of the day: {headword}");
                println!("{}", self.styled(formatted));
            }
        }
        Ok(())
    }
}
