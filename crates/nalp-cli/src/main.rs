mod config;
mod history_cmds;
mod plan_cmds;
mod serve_cmd;
#[cfg(test)]
mod test_util;

use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use config::{CliOverrides, NalpConfig};

#[derive(Parser)]
#[command(name = "nalp", version, about = "Turn a product idea into a concrete, priced build plan")]
struct Cli {
    /// Config file path (defaults to ~/.config/nalp/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Model name (overrides NALP_MODEL env var)
    #[arg(long, global = true)]
    model: Option<String>,

    /// History directory (overrides NALP_HISTORY_DIR env var)
    #[arg(long, global = true)]
    history_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default nalp config file
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Run the HTTP API
    Serve {
        /// Address to bind (overrides NALP_BIND env var)
        #[arg(long)]
        bind: Option<String>,
        /// Port to listen on (overrides NALP_PORT env var)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print clarifying questions for an idea
    Questions {
        /// The app idea
        idea: String,
    },
    /// Generate a build plan for an idea
    Plan {
        /// The app idea
        idea: String,
        /// Target platform (repeatable, e.g. --platform iOS --platform "Web App")
        #[arg(long = "platform")]
        platforms: Vec<String>,
        /// Monthly budget
        #[arg(long, default_value = "Free")]
        budget: String,
        /// Coding skill level
        #[arg(long, default_value = "No Code")]
        skill: String,
        /// What matters most: Speed, Quality or Scale
        #[arg(long, default_value = "Speed")]
        priority: String,
        /// Persona: "Senior Engineer", "Brutal Truth" or "Supportive Coach"
        #[arg(long, default_value = "Senior Engineer")]
        vibe: String,
        /// Answer clarifying questions on stdin before planning
        #[arg(long, short)]
        interactive: bool,
        /// Print markdown instead of JSON
        #[arg(long)]
        markdown: bool,
        /// Save the plan to history
        #[arg(long)]
        save: bool,
    },
    /// Saved plan history
    History {
        #[command(subcommand)]
        command: HistoryCommands,
    },
    /// Generate shell completions
    Completions {
        /// Target shell
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum HistoryCommands {
    /// List saved plans, newest first
    List,
    /// Show a saved plan
    Show {
        /// History record ID
        id: String,
    },
    /// Export a saved plan as markdown
    Export {
        /// History record ID
        id: String,
        /// Output file path (defaults to stdout)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Delete a saved plan
    Delete {
        /// History record ID
        id: String,
    },
}

/// Execute the `nalp init` command: write a default config file.
fn cmd_init(path: Option<PathBuf>, force: bool) -> anyhow::Result<()> {
    let path = path.unwrap_or_else(config::config_path);

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let cfg = config::ConfigFile::default();
    config::save_config(&cfg, &path)?;

    println!("Config written to {}", path.display());
    println!("  server = {}:{}", cfg.server.bind, cfg.server.port);
    println!("  model.name = {}", cfg.model.name);
    println!("  history.dir = {}", cfg.history.dir.display());
    println!();
    println!(
        "Next: export {} with your API key, then run `nalp serve`.",
        cfg.model.api_key_env
    );

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut overrides = CliOverrides {
        config: cli.config.clone(),
        model: cli.model.clone(),
        history_dir: cli.history_dir.clone(),
        ..CliOverrides::default()
    };

    match cli.command {
        Commands::Init { force } => {
            cmd_init(cli.config, force)?;
        }
        Commands::Serve { bind, port } => {
            overrides.bind = bind;
            overrides.port = port;
            let resolved = NalpConfig::resolve(&overrides)?;
            serve_cmd::run_serve(&resolved).await?;
        }
        Commands::Questions { idea } => {
            let resolved = NalpConfig::resolve(&overrides)?;
            let synth = resolved.synthesizer()?;
            plan_cmds::run_questions(&synth, &idea).await?;
        }
        Commands::Plan {
            idea,
            platforms,
            budget,
            skill,
            priority,
            vibe,
            interactive,
            markdown,
            save,
        } => {
            let resolved = NalpConfig::resolve(&overrides)?;
            let synth = resolved.synthesizer()?;
            let options = plan_cmds::PlanOptions {
                idea,
                platforms,
                budget,
                skill,
                priority,
                vibe,
                interactive,
                markdown,
                save,
            };
            plan_cmds::run_plan(&synth, &resolved.history_store(), &options).await?;
        }
        Commands::History { command } => {
            let resolved = NalpConfig::resolve(&overrides)?;
            history_cmds::run_history_command(command, &resolved.history_store()).await?;
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "nalp", &mut std::io::stdout());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn plan_defaults_match_first_choices() {
        let cli = Cli::try_parse_from(["nalp", "plan", "a todo app"]).unwrap();
        let Commands::Plan {
            budget,
            skill,
            priority,
            vibe,
            platforms,
            interactive,
            ..
        } = cli.command
        else {
            panic!("expected plan command");
        };
        assert_eq!(budget, "Free");
        assert_eq!(skill, "No Code");
        assert_eq!(priority, "Speed");
        assert_eq!(vibe, "Senior Engineer");
        assert!(platforms.is_empty());
        assert!(!interactive);
    }

    #[test]
    fn global_flags_work_after_subcommand() {
        let cli = Cli::try_parse_from(["nalp", "history", "list", "--history-dir", "/tmp/h"]).unwrap();
        assert_eq!(cli.history_dir, Some(PathBuf::from("/tmp/h")));
    }

    #[test]
    fn init_refuses_to_overwrite_without_force() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");

        cmd_init(Some(path.clone()), false).unwrap();
        let err = cmd_init(Some(path.clone()), false).unwrap_err();
        assert!(err.to_string().contains("already exists"));
        cmd_init(Some(path), true).unwrap();
    }
}
