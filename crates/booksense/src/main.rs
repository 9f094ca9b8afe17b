//! A terminal host that mounts the BookSense widgets.

#[macro_use]
extern crate tracing;

use std::env;
use std::io::Write as _;
use std::path::PathBuf;
use std::pin::pin;
use std::time::Duration;

use booksense::core::image::ImageState;
use booksense::core::store::{
    FileStore, KeyValueStore, MemoryStore, StoreError,
};
use booksense::core::{Credential, Rejection, SubmitOutcome};
use booksense::{QUICK_PROMPTS, Session, SessionBuilder};
use booksense_cat_api::CatApiConfigBuilder;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use tokio::io::{self, AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::select;
use tokio::sync::mpsc::{self, UnboundedReceiver};

const BAR_CHAR: &str = "▎";

const HELP: &str = "\
Commands:
  <text>            ask for recommendations
  (empty line)      send the current draft
  /quick            list the suggested questions
  /quick <1-3>      send a suggested question
  /model [id]       show or change the Gemini model
  /key <key>        set the Gemini API key
  /remember on|off  keep the API key on this machine or forget it
  /cat              fetch another cat picture
  /help             show this help
  /quit             leave";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Send(String),
    SendDraft,
    Quick(Option<usize>),
    Model(Option<String>),
    Key(String),
    Remember(Option<bool>),
    Cat,
    Help,
    Quit,
    Unknown(String),
}

fn parse_command(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::SendDraft;
    }
    let Some(command) = line.strip_prefix('/') else {
        return Command::Send(line.to_owned());
    };

    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };
    match (name, arg) {
        ("quick", "") => Command::Quick(None),
        ("quick", n) => match n.parse::<usize>() {
            Ok(n) if n >= 1 => Command::Quick(Some(n - 1)),
            _ => Command::Unknown(line.to_owned()),
        },
        ("model", "") => Command::Model(None),
        ("model", id) => Command::Model(Some(id.to_owned())),
        ("key", key) => Command::Key(key.to_owned()),
        ("remember", "") => Command::Remember(None),
        ("remember", "on") => Command::Remember(Some(true)),
        ("remember", "off") => Command::Remember(Some(false)),
        ("cat", "") => Command::Cat,
        ("help", "") => Command::Help,
        ("quit" | "exit", "") => Command::Quit,
        _ => Command::Unknown(line.to_owned()),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut store = open_store();

    let (credential, mut key_from_env) =
        initial_credential(env_value("GEMINI_API_KEY"), store.as_ref());

    let mut image_config = CatApiConfigBuilder::new();
    if let Some(api_key) = env_value("CAT_API_KEY") {
        image_config = image_config.with_api_key(api_key);
    }

    let (delta_tx, mut delta_rx) = mpsc::unbounded_channel();

    let mut builder = SessionBuilder::with_gemini(env_value("GEMINI_BASE_URL"))
    .with_credential(credential)
    .with_image_config(image_config.build())
    .on_transcript(move |delta| {
        delta_tx.send(delta.to_owned()).ok();
    });
    if let Some(model) = env_value("GEMINI_MODEL") {
        builder = builder.with_model(model);
    }

    let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")
        .map(|style| style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"))
        .unwrap_or_else(|_| ProgressStyle::default_spinner());

    let session = {
        let progress_bar =
            new_spinner(&progress_style, "🐱 Fetching a cat...");
        let session = builder.mount().await;
        progress_bar.finish_and_clear();
        session
    };
    print_image(&session.image().state());

    if let Some(welcome) = session.chat().snapshot().conversation().last() {
        let bar = BAR_CHAR.bright_cyan();
        println!("{bar}📚 {}", welcome.text.bright_white());
    }
    if !session.chat().credential().is_configured() {
        println!("{}", "Set your Gemini API key with /key <key>.".yellow());
    }
    println!("{}", "Type /help for commands.".dimmed());

    let mut stdin = BufReader::new(io::stdin()).lines();

    loop {
        let draft = session.chat().snapshot().draft().to_owned();
        if !draft.is_empty() {
            println!("{} {}", "draft (Enter to send):".dimmed(), draft);
        }
        print!("> ");
        std::io::stdout().flush().ok();

        let Some(line) = read_line(&mut stdin).await else {
            break;
        };

        let outcome = match parse_command(&line) {
            Command::Send(text) => {
                let submit = session.send_message(&text);
                wait_for_reply(submit, &mut delta_rx, &progress_style).await
            }
            Command::SendDraft => {
                let submit = session.chat().submit_draft();
                wait_for_reply(submit, &mut delta_rx, &progress_style).await
            }
            Command::Quick(Some(index)) if index < QUICK_PROMPTS.len() => {
                println!("> {}", QUICK_PROMPTS[index]);
                let submit = async {
                    let outcome = session.send_quick_prompt(index).await;
                    outcome.unwrap_or(SubmitOutcome::Rejected(
                        Rejection::EmptyInput,
                    ))
                };
                wait_for_reply(submit, &mut delta_rx, &progress_style).await
            }
            Command::Quick(_) => {
                for (i, prompt) in QUICK_PROMPTS.iter().enumerate() {
                    println!("  {} {prompt}", format!("{}.", i + 1).bold());
                }
                continue;
            }
            Command::Model(None) => {
                println!("Model: {}", session.chat().snapshot().model());
                continue;
            }
            Command::Model(Some(model)) => {
                session.chat().set_model(model);
                println!("Model: {}", session.chat().snapshot().model());
                continue;
            }
            Command::Key(key) => {
                session.chat().set_api_key(key);
                key_from_env = false;
                let credential = session.chat().credential();
                report_saved(save_credential(
                    &credential,
                    key_from_env,
                    store.as_mut(),
                ));
                continue;
            }
            Command::Remember(None) => {
                let remember = session.chat().credential().remember();
                let remember = if remember { "on" } else { "off" };
                println!("Remember key: {remember}");
                continue;
            }
            Command::Remember(Some(remember)) => {
                session.chat().set_remember(remember);
                let credential = session.chat().credential();
                report_saved(save_credential(
                    &credential,
                    key_from_env,
                    store.as_mut(),
                ));
                continue;
            }
            Command::Cat => {
                let progress_bar =
                    new_spinner(&progress_style, "🐱 Fetching a cat...");
                session.refresh_image().await;
                progress_bar.finish_and_clear();
                print_image(&session.image().state());
                continue;
            }
            Command::Help => {
                println!("{HELP}");
                continue;
            }
            Command::Quit => break,
            Command::Unknown(line) => {
                println!("{} {line}", "Unknown command:".red());
                continue;
            }
        };

        print_outcome(&session, outcome);
    }
}

/// Drives `submit` while rendering the reply as it streams in. Returns the
/// outcome and whether any reply text was printed.
async fn wait_for_reply(
    submit: impl Future<Output = SubmitOutcome>,
    delta_rx: &mut UnboundedReceiver<String>,
    progress_style: &ProgressStyle,
) -> (SubmitOutcome, bool) {
    let mut submit = pin!(submit);
    let mut progress_bar =
        Some(new_spinner(progress_style, "🤔 Thinking..."));
    let mut streamed = false;

    let outcome = loop {
        select! {
            outcome = &mut submit => break outcome,
            Some(delta) = delta_rx.recv() => {
                print_delta(&delta, &mut progress_bar, &mut streamed);
            }
        }
    };

    // Deltas sent right before the reply settled.
    while let Ok(delta) = delta_rx.try_recv() {
        print_delta(&delta, &mut progress_bar, &mut streamed);
    }
    if let Some(progress_bar) = progress_bar {
        progress_bar.finish_and_clear();
    }
    if streamed {
        println!();
    }
    (outcome, streamed)
}

fn print_delta(
    delta: &str,
    progress_bar: &mut Option<ProgressBar>,
    streamed: &mut bool,
) {
    // Finish the progress bar before printing anything else.
    if let Some(progress_bar) = progress_bar.take() {
        progress_bar.finish_and_clear();
    }
    if !*streamed {
        print!("{}🤖 ", BAR_CHAR.bright_cyan());
        *streamed = true;
    }
    print!("{}", delta.bright_white());
    std::io::stdout().flush().ok();
}

fn print_outcome(
    session: &Session,
    (outcome, streamed): (SubmitOutcome, bool),
) {
    let state = session.chat().snapshot();
    match outcome {
        SubmitOutcome::Replied if !streamed => {
            if let Some(reply) = state.conversation().last() {
                let bar = BAR_CHAR.bright_cyan();
                println!("{bar}🤖 {}", reply.text.dimmed());
            }
        }
        SubmitOutcome::Replied => {}
        SubmitOutcome::Rejected(Rejection::EmptyInput) => {
            println!("{}", "Nothing to send.".dimmed());
        }
        SubmitOutcome::Rejected(Rejection::InFlight) => {}
        SubmitOutcome::Rejected(Rejection::MissingCredential)
        | SubmitOutcome::Failed => {
            if let Some(error) = state.error() {
                println!("{}⚠ {}", BAR_CHAR.bright_red(), error.red());
            }
        }
    }
}

fn print_image(state: &ImageState) {
    let bar = BAR_CHAR.bright_yellow();
    if let Some(url) = &state.image_url {
        println!("{bar}🐱 {}", url.underline());
    } else if let Some(error) = &state.error {
        println!("{bar}⚠ {}", error.red());
    }
}

/// Reads an environment variable, treating a blank value as unset.
fn env_value(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

/// Picks the startup key: a non-blank environment key wins over the saved
/// one. Returns whether the key came from the environment.
fn initial_credential(
    env_key: Option<String>,
    store: &dyn KeyValueStore,
) -> (Credential, bool) {
    let mut credential = Credential::default();
    if let Some(api_key) = env_key.filter(|key| !key.trim().is_empty()) {
        credential.set_api_key(api_key);
        return (credential, true);
    }
    if credential.restore(store) {
        debug!("restored the saved api key");
    }
    (credential, false)
}

#[derive(Debug, PartialEq, Eq)]
enum Saved {
    Stored,
    Forgotten,
    LeftInEnvironment,
}

/// Mirrors the credential into the store, except that a key taken from the
/// environment is never written out.
fn save_credential(
    credential: &Credential,
    key_from_env: bool,
    store: &mut dyn KeyValueStore,
) -> Result<Saved, StoreError> {
    let keep = credential.remember() && credential.is_configured();
    if keep && key_from_env {
        return Ok(Saved::LeftInEnvironment);
    }
    credential.persist(store)?;
    Ok(if keep { Saved::Stored } else { Saved::Forgotten })
}

fn report_saved(result: Result<Saved, StoreError>) {
    match result {
        Ok(Saved::Stored) => {
            println!("{}", "API key saved.".dimmed());
        }
        Ok(Saved::Forgotten) => {
            println!("{}", "API key is not kept on this machine.".dimmed());
        }
        Ok(Saved::LeftInEnvironment) => {
            let hint = "The key from GEMINI_API_KEY is not saved, set it \
                        with /key to keep it.";
            println!("{}", hint.dimmed());
        }
        Err(err) => {
            error!("failed to save the api key: {err}");
            println!("{} {err}", "Could not save the API key:".red());
        }
    }
}

fn open_store() -> Box<dyn KeyValueStore> {
    let path = env::var_os("BOOKSENSE_STORE").map(PathBuf::from).or_else(|| {
        dirs::config_dir().map(|dir| dir.join("booksense").join("store.json"))
    });
    let Some(path) = path else {
        warn!("no config directory, the api key will not be remembered");
        return Box::new(MemoryStore::default());
    };

    match FileStore::open(&path) {
        Ok(store) => Box::new(store),
        Err(err) => {
            warn!("failed to open store at {}: {err}", path.display());
            Box::new(MemoryStore::default())
        }
    }
}

fn new_spinner(style: &ProgressStyle, message: &'static str) -> ProgressBar {
    let progress_bar = ProgressBar::new_spinner();
    progress_bar.set_style(style.clone());
    progress_bar.set_message(message);
    progress_bar.enable_steady_tick(Duration::from_millis(100));
    progress_bar
}

async fn read_line(stdin: &mut Lines<BufReader<Stdin>>) -> Option<String> {
    match stdin.next_line().await {
        Ok(line) => line,
        Err(err) => {
            error!("error reading input: {}", err);
            None
        }
    }
}
