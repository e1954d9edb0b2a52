
use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Select};
use std::path::Path;

use super::settings::{COHERE_API_KEY_ENV, Credentials, PINECONE_API_KEY_ENV, REGION_ENV};
use super::{Config, ConfigError, NamespacePolicy, settings::validate_collection_name};

#[inline]
pub fn run_interactive_config(config_dir: &Path) -> Result<()> {
    eprintln!("{}", style("🔧 FinWhiz Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config(config_dir)?;

    eprintln!("{}", style("Vector Index").bold().yellow());
    eprintln!("Configure the collection your documents are indexed into.");
    eprintln!();
    configure_index(&mut config)?;

    eprintln!();
    eprintln!("{}", style("Models").bold().yellow());
    configure_models(&mut config)?;

    eprintln!();
    report_credentials();

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config(config_dir: &Path) -> Result<()> {
    let config = Config::load(config_dir).context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Index Settings:").bold().yellow());
    eprintln!("  Collection: {}", style(&config.index.collection_name).cyan());
    eprintln!("  Dimension: {}", style(config.index.dimension).cyan());
    eprintln!("  Metric: {}", style(config.index.metric).cyan());
    eprintln!(
        "  Cloud/Region: {}/{}",
        style(&config.index.cloud).cyan(),
        style(&config.index.region).cyan()
    );
    eprintln!(
        "  Namespace policy: {}",
        style(format!("{:?}", config.index.namespace_policy)).cyan()
    );
    eprintln!("  Top K: {}", style(config.index.top_k).cyan());
    eprintln!("  Chunk size: {}", style(config.chunking.chunk_size).cyan());

    eprintln!();
    eprintln!("{}", style("Model Settings:").bold().yellow());
    eprintln!("  Cohere URL: {}", style(&config.cohere.base_url).cyan());
    eprintln!("  Embed model: {}", style(&config.cohere.embed_model).cyan());
    eprintln!("  Chat model: {}", style(&config.cohere.chat_model).cyan());
    eprintln!(
        "  Pinecone URL: {}",
        style(&config.pinecone.control_plane_url).cyan()
    );

    eprintln!();
    report_credentials();

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}

fn load_existing_config(config_dir: &Path) -> Result<Config> {
    Config::load(config_dir).map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No valid configuration found. Using defaults.").yellow()
            );
            Ok(Config {
                base_dir: config_dir.to_path_buf(),
                ..Config::default()
            })
        },
        |config| {
            eprintln!("{}", style("Found existing configuration.").green());
            Ok(config)
        },
    )
}

fn configure_index(config: &mut Config) -> Result<()> {
    let collection_name: String = Input::new()
        .with_prompt("Collection name")
        .default(config.index.collection_name.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            validate_collection_name(input)
        })
        .interact_text()?;

    let region: String = Input::new()
        .with_prompt(format!("Region (overridden by ${})", REGION_ENV))
        .default(config.index.region.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Region cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let policies = &["per-document", "shared"];
    let default_index = match config.index.namespace_policy {
        NamespacePolicy::PerDocument => 0,
        NamespacePolicy::Shared => 1,
    };
    let policy_index = Select::new()
        .with_prompt("Namespace policy")
        .default(default_index)
        .items(policies)
        .interact()?;

    let top_k: usize = Input::new()
        .with_prompt("Snippets retrieved per question")
        .default(config.index.top_k)
        .validate_with(|input: &usize| -> Result<(), &str> {
            if (1..=100).contains(input) {
                Ok(())
            } else {
                Err("Top K must be between 1 and 100")
            }
        })
        .interact_text()?;

    config.index.set_collection_name(collection_name)?;
    config.index.set_region(region)?;
    config.index.set_top_k(top_k)?;
    config.index.namespace_policy = if policy_index == 0 {
        NamespacePolicy::PerDocument
    } else {
        NamespacePolicy::Shared
    };

    Ok(())
}

fn configure_models(config: &mut Config) -> Result<()> {
    let embed_model: String = Input::new()
        .with_prompt("Embedding model")
        .default(config.cohere.embed_model.clone())
        .interact_text()?;

    let chat_model: String = Input::new()
        .with_prompt("Chat model")
        .default(config.cohere.chat_model.clone())
        .interact_text()?;

    config.cohere.set_embed_model(embed_model)?;
    config.cohere.set_chat_model(chat_model)?;

    Ok(())
}

fn report_credentials() {
    eprintln!("{}", style("Credentials (environment only):").bold().yellow());
    for name in [COHERE_API_KEY_ENV, PINECONE_API_KEY_ENV] {
        eprintln!("  {}: {}", name, credential_status(name));
    }
    if let Err(e) = Credentials::from_env() {
        eprintln!("{}", style(format!("⚠ {}", e)).yellow());
    }
}

fn credential_status(name: &str) -> console::StyledObject<&'static str> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => style("set").green(),
        _ => style("missing").red(),
    }
}
