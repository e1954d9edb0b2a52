use anyhow::{Context, Result};
use console::style;
use dialoguer::Input;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::assistant::Assistant;
use crate::config::settings::COHERE_API_KEY_ENV;
use crate::config::{Config, Credentials, read_credential};
use crate::database::{InMemoryIndex, PineconeIndex, VectorIndex};
use crate::document::Document;
use crate::embeddings::CohereEmbedder;
use crate::generation::CohereChat;
use crate::session::Session;

/// The concrete remote capabilities one command runs against
pub struct Backends {
    embedder: CohereEmbedder,
    index: Box<dyn VectorIndex>,
    chat: CohereChat,
}

impl Backends {
    /// Build Cohere and Pinecone clients from `config` and environment credentials.
    ///
    /// With `in_memory` the vector index lives in this process and only the
    /// Cohere key is required.
    #[inline]
    pub fn from_config(config: &Config, in_memory: bool) -> Result<Self> {
        let env = |name: &str| std::env::var(name).ok();

        let (cohere_key, index): (String, Box<dyn VectorIndex>) = if in_memory {
            info!("Using in-memory vector index");
            (
                read_credential(env, COHERE_API_KEY_ENV)?,
                Box::new(InMemoryIndex::new()),
            )
        } else {
            let credentials = Credentials::from_env()?;
            let index = PineconeIndex::new(
                &config.pinecone,
                &config.index,
                &config.http,
                &credentials.pinecone_api_key,
            )
            .context("Failed to create Pinecone client")?;
            (credentials.cohere_api_key, Box::new(index))
        };

        let embedder = CohereEmbedder::new(&config.cohere, &config.http, &cohere_key)
            .context("Failed to create Cohere embedding client")?;
        let chat = CohereChat::new(&config.cohere, &config.http, &cohere_key)
            .context("Failed to create Cohere chat client")?;

        Ok(Self {
            embedder,
            index,
            chat,
        })
    }

    #[inline]
    pub fn assistant<'a>(&'a self, config: &'a Config) -> Assistant<'a> {
        Assistant::new(&self.embedder, self.index.as_ref(), &self.chat, config)
    }
}

fn spinner(message: &'static str) -> ProgressBar {
    let bar = if console::user_attended_stderr() {
        ProgressBar::new_spinner().with_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        )
    } else {
        ProgressBar::hidden()
    };
    bar.set_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

fn load_document(file: &Path) -> Result<Document> {
    Document::from_path(file).with_context(|| format!("Failed to load {}", file.display()))
}

fn upload(session: &mut Session, assistant: &Assistant<'_>, document: &Document) -> Result<()> {
    let bar = spinner("Indexing document...");
    let result = session.upload(assistant, document);
    bar.finish_and_clear();
    let handle = result.with_context(|| format!("Failed to index {}", document.name))?;

    eprintln!(
        "{} Indexed {} into {}",
        style("✓").green(),
        style(&document.name).cyan(),
        style(&handle.name).cyan()
    );
    Ok(())
}

/// An in-memory index is dropped when the command exits, so a standalone
/// `index` run against it would store nothing
fn check_index_target(in_memory: bool) -> Result<()> {
    if in_memory {
        anyhow::bail!(
            "--in-memory keeps vectors only while one command runs; use `ask` or `chat` with --in-memory instead"
        );
    }
    Ok(())
}

/// Index a document and report where it went
#[inline]
pub fn index_file(config_dir: &Path, file: &Path, in_memory: bool) -> Result<()> {
    check_index_target(in_memory)?;
    let config = Config::load(config_dir).context("Failed to load configuration")?;
    let backends = Backends::from_config(&config, in_memory)?;
    let assistant = backends.assistant(&config);

    let document = load_document(file)?;
    let bar = spinner("Indexing document...");
    let result = assistant.index_document(&document);
    bar.finish_and_clear();
    let handle = result.with_context(|| format!("Failed to index {}", document.name))?;

    println!("Indexed {} into collection {}", document.name, handle.name);
    if let Some(namespace) = &handle.namespace {
        println!("Namespace: {}", namespace);
    }
    Ok(())
}

/// Index a document, answer one question about it and print the answer
#[inline]
pub fn ask_file(config_dir: &Path, file: &Path, question: &str, in_memory: bool) -> Result<()> {
    let config = Config::load(config_dir).context("Failed to load configuration")?;
    let backends = Backends::from_config(&config, in_memory)?;
    let assistant = backends.assistant(&config);

    let mut session = Session::new();
    upload(&mut session, &assistant, &load_document(file)?)?;

    let bar = spinner("Generating answer...");
    let result = session.ask(&assistant, question);
    bar.finish_and_clear();
    let entry = result.context("Failed to answer question")?;

    println!("{}", entry.answer);
    Ok(())
}

/// One line typed into the chat loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatInput {
    Question(String),
    History,
    Save(usize),
    Upload(PathBuf),
    Help,
    Quit,
    Empty,
    Invalid(String),
}

impl ChatInput {
    #[inline]
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }
        let Some(command) = line.strip_prefix('/') else {
            return Self::Question(line.to_string());
        };

        let (name, argument) = command
            .split_once(char::is_whitespace)
            .map_or((command, ""), |(name, rest)| (name, rest.trim()));

        match name {
            "history" => Self::History,
            "help" => Self::Help,
            "quit" | "exit" => Self::Quit,
            "save" => match argument.parse::<usize>() {
                Ok(n) if n >= 1 => Self::Save(n),
                _ => Self::Invalid("usage: /save <n>, where 1 is the most recent answer".into()),
            },
            "upload" if !argument.is_empty() => Self::Upload(PathBuf::from(argument)),
            "upload" => Self::Invalid("usage: /upload <file>".into()),
            other => Self::Invalid(format!("unknown command /{}", other)),
        }
    }
}

fn print_help() {
    eprintln!("{}", style("Commands:").bold().yellow());
    eprintln!("  /history        show previous answers, most recent first");
    eprintln!("  /save <n>       export answer n to finwhiz_response_<n>.txt");
    eprintln!("  /upload <file>  index another .pdf or .txt file");
    eprintln!("  /quit           end the session");
    eprintln!("Anything else is asked as a question.");
}

fn print_history(session: &Session) {
    if session.history().is_empty() {
        eprintln!("No questions asked yet.");
        return;
    }

    for (position, entry) in session.history().list().enumerate() {
        println!(
            "{} {}",
            style(format!("[{}]", position + 1)).bold(),
            style(entry.asked_at.format("%Y-%m-%d %H:%M:%S")).dim()
        );
        println!("  Q: {}", entry.question);
        println!("  A: {}", entry.answer);
        println!();
    }
}

/// Interactive question loop over an uploaded document
#[inline]
pub fn chat(config_dir: &Path, file: &Path, in_memory: bool) -> Result<()> {
    let config = Config::load(config_dir).context("Failed to load configuration")?;
    let backends = Backends::from_config(&config, in_memory)?;
    let assistant = backends.assistant(&config);

    let mut session = Session::new();
    upload(&mut session, &assistant, &load_document(file)?)?;

    eprintln!("{}", style("💬 FinWhiz").bold().cyan());
    print_help();
    eprintln!();

    loop {
        let line: String = Input::new()
            .with_prompt("Question")
            .allow_empty(true)
            .interact_text()?;

        match ChatInput::parse(&line) {
            ChatInput::Empty => {}
            ChatInput::Quit => break,
            ChatInput::Help => print_help(),
            ChatInput::History => print_history(&session),
            ChatInput::Invalid(message) => eprintln!("{}", style(message).yellow()),
            ChatInput::Save(n) => match session.export(n, &config.export.directory) {
                Ok(path) => eprintln!("{} Saved {}", style("✓").green(), path.display()),
                Err(e) => eprintln!("{} {}", style("✗").red(), e),
            },
            ChatInput::Upload(path) => {
                let result =
                    load_document(&path).and_then(|doc| upload(&mut session, &assistant, &doc));
                if let Err(e) = result {
                    warn!("Upload failed: {:#}", e);
                    eprintln!("{} {:#}", style("✗").red(), e);
                }
            }
            ChatInput::Question(question) => {
                let bar = spinner("Generating answer...");
                let result = session.ask(&assistant, &question);
                bar.finish_and_clear();
                match result {
                    Ok(entry) => {
                        println!("{}", entry.answer);
                        println!();
                    }
                    Err(e) => {
                        warn!("Question failed: {}", e);
                        eprintln!("{} {}", style("✗").red(), e);
                    }
                }
            }
        }
    }

    eprintln!(
        "Session ended with {} answered question(s).",
        session.history().len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_lines_are_questions() {
        assert_eq!(
            ChatInput::parse("  What is the cash balance?  "),
            ChatInput::Question("What is the cash balance?".to_string())
        );
        assert_eq!(ChatInput::parse("   "), ChatInput::Empty);
    }

    #[test]
    fn slash_commands() {
        assert_eq!(ChatInput::parse("/history"), ChatInput::History);
        assert_eq!(ChatInput::parse("/quit"), ChatInput::Quit);
        assert_eq!(ChatInput::parse("/exit"), ChatInput::Quit);
        assert_eq!(ChatInput::parse("/help"), ChatInput::Help);
        assert_eq!(ChatInput::parse("/save 2"), ChatInput::Save(2));
        assert_eq!(
            ChatInput::parse("/upload  reports/q3 statement.pdf "),
            ChatInput::Upload(PathBuf::from("reports/q3 statement.pdf"))
        );
    }

    #[test]
    fn standalone_index_needs_a_persistent_store() {
        let error = check_index_target(true).expect_err("in-memory index is rejected");
        assert!(error.to_string().contains("--in-memory"));
        assert!(check_index_target(false).is_ok());
    }

    #[test]
    fn index_file_rejects_in_memory_before_reading_anything() {
        let missing = Path::new("/nonexistent/finwhiz-config");
        let error = index_file(missing, Path::new("statement.txt"), true)
            .expect_err("in-memory index is rejected");
        assert!(error.to_string().contains("ask"));
    }

    #[test]
    fn malformed_commands_are_invalid() {
        for line in ["/save", "/save 0", "/save two", "/upload", "/delete 1"] {
            assert!(
                matches!(ChatInput::parse(line), ChatInput::Invalid(_)),
                "{} should be invalid",
                line
            );
        }
    }
}
