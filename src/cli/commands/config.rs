use anyhow::{Context, Result};
use clap::Subcommand;

use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    #[command(about = "Initialize configuration file")]
    Init {
        #[arg(long, help = "Overwrite an existing config")]
        force: bool,
    },
    #[command(about = "Show current configuration")]
    Show,
    #[command(about = "Show configuration file path")]
    Path,
    #[command(about = "Set a configuration value, e.g. pipeline.batch_size 16")]
    Set { key: String, value: String },
}

pub async fn handle_config(cmd: ConfigCommand, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);

    match cmd {
        ConfigCommand::Init { force } => {
            let path = Config::config_path()
                .ok_or_else(|| anyhow::anyhow!("could not determine config directory"))?;
            if path.exists() && !force {
                anyhow::bail!(
                    "Config already exists at: {}\nUse --force to overwrite.",
                    path.display()
                );
            }
            Config::default()
                .save_to(&path)
                .context("failed to create config")?;
            println!(
                "{}",
                formatter.format_message(&format!("Created config at: {}", path.display()))
            );
        }
        ConfigCommand::Show => {
            let config = Config::load()?;
            if format == OutputFormat::Json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                if let Some(path) = Config::config_path() {
                    println!("# {}", path.display());
                }
                print!("{}", toml::to_string_pretty(&config)?);
            }
        }
        ConfigCommand::Path => match Config::config_path() {
            Some(path) => println!("{}", path.display()),
            None => anyhow::bail!("could not determine config directory"),
        },
        ConfigCommand::Set { key, value } => {
            let mut config = Config::load()?;
            config
                .set(&key, &value)
                .with_context(|| format!("failed to set {key}"))?;
            config.save().context("failed to save config")?;
            println!(
                "{}",
                formatter.format_message(&format!("Set {key} = {value}"))
            );
        }
    }

    Ok(())
}
