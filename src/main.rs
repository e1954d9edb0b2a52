use clap::{Parser, Subcommand};
use finwhiz::Result;
use finwhiz::commands::{ask_file, chat, index_file};
use finwhiz::config::{get_config_dir, run_interactive_config, show_config};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "finwhiz")]
#[command(about = "Ask questions about financial documents, answered from their own text")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml (defaults to the platform config directory)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,
    /// Keep vectors in process memory instead of Pinecone
    #[arg(long, global = true)]
    in_memory: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the collection and models
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Index a .pdf or .txt document
    Index {
        /// Document to index
        file: PathBuf,
    },
    /// Index a document and answer one question about it
    Ask {
        /// Document to index
        file: PathBuf,
        /// Question to answer from the document
        question: String,
    },
    /// Start an interactive question session over a document
    Chat {
        /// Document to index first
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_dir = get_config_dir(cli.config_dir.as_deref())?;

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config(&config_dir)?;
            } else {
                run_interactive_config(&config_dir)?;
            }
        }
        Commands::Index { file } => {
            index_file(&config_dir, &file, cli.in_memory)?;
        }
        Commands::Ask { file, question } => {
            ask_file(&config_dir, &file, &question, cli.in_memory)?;
        }
        Commands::Chat { file } => {
            chat(&config_dir, &file, cli.in_memory)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn index_command_with_file() {
        let cli = Cli::try_parse_from(["finwhiz", "index", "statement.pdf"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            assert!(!parsed.in_memory);
            assert_eq!(parsed.config_dir, None);
            if let Commands::Index { file } = parsed.command {
                assert_eq!(file, PathBuf::from("statement.pdf"));
            }
        }
    }

    #[test]
    fn ask_command() {
        let cli = Cli::try_parse_from([
            "finwhiz",
            "ask",
            "statement.txt",
            "What amount is mentioned?",
        ]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Ask { file, question } = parsed.command {
                assert_eq!(file, PathBuf::from("statement.txt"));
                assert_eq!(question, "What amount is mentioned?");
            }
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "finwhiz",
            "chat",
            "statement.txt",
            "--in-memory",
            "--config-dir",
            "/tmp/finwhiz",
        ]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            assert!(parsed.in_memory);
            assert_eq!(parsed.config_dir, Some(PathBuf::from("/tmp/finwhiz")));
            assert!(matches!(parsed.command, Commands::Chat { .. }));
        }
    }

    #[test]
    fn config_show_flag() {
        let cli = Cli::try_parse_from(["finwhiz", "config", "--show"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Config { show } = parsed.command {
                assert!(show);
            }
        }
    }

    #[test]
    fn ask_requires_question() {
        let cli = Cli::try_parse_from(["finwhiz", "ask", "statement.txt"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        }
    }

    #[test]
    fn invalid_command() {
        let cli = Cli::try_parse_from(["finwhiz", "invalid"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        }
    }

    #[test]
    fn help_message() {
        let cli = Cli::try_parse_from(["finwhiz", "--help"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        }
    }
}
