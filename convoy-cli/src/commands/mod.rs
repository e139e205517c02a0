//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod app;
mod render;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Create an application and deploy it
    Create {
        /// Application name, also the container name on every instance
        name: String,

        /// Docker hosts, e.g. 10.0.0.5:2375 (comma-separated)
        #[arg(short, long, value_delimiter = ',', required = true)]
        instances: Vec<String>,

        /// JSON file holding the Docker `containers/create` body
        #[arg(short, long)]
        command: String,

        /// Pull the image on every instance first
        #[arg(long)]
        pull: bool,
    },
    /// List applications
    List,
    /// Show an application
    Show {
        /// Application id or name
        id: String,
    },
    /// Show the deployment history of an application
    History {
        /// Application id or name
        id: String,
    },
    /// Start an application's containers
    Start {
        /// Application id or name
        id: String,
    },
    /// Stop an application's containers
    Stop {
        /// Application id or name
        id: String,
    },
    /// Redeploy a previous deployment
    Revert {
        /// Application id or name
        id: String,

        /// Deployment id, or a negative offset from the latest deployment
        #[arg(allow_hyphen_values = true)]
        target: i64,
    },
    /// Change instances and/or command
    Update {
        /// Application id or name
        id: String,

        /// Instances to add (comma-separated)
        #[arg(long, value_delimiter = ',')]
        add: Vec<String>,

        /// Instances to remove (comma-separated)
        #[arg(long, value_delimiter = ',')]
        remove: Vec<String>,

        /// JSON file holding a new `containers/create` body
        #[arg(short, long)]
        command: Option<String>,

        /// Redeploy every instance even without a new command
        #[arg(long)]
        restart: bool,

        /// Pull the image on every instance first
        #[arg(long)]
        pull: bool,
    },
}

/// Handle a CLI command
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    let client = config.client();

    match command {
        Commands::Create {
            name,
            instances,
            command,
            pull,
        } => app::create(&client, name, instances, &command, pull).await,
        Commands::List => app::list(&client).await,
        Commands::Show { id } => app::show(&client, &id).await,
        Commands::History { id } => app::history(&client, &id).await,
        Commands::Start { id } => app::start(&client, &id).await,
        Commands::Stop { id } => app::stop(&client, &id).await,
        Commands::Revert { id, target } => app::revert(&client, &id, target).await,
        Commands::Update {
            id,
            add,
            remove,
            command,
            restart,
            pull,
        } => {
            let update = app::UpdateArgs {
                add,
                remove,
                command,
                restart,
                force_pull: pull,
            };
            app::update(&client, &id, update).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(subcommand)]
        command: Commands,
    }

    #[test]
    fn test_revert_accepts_negative_target() {
        let parsed = Harness::try_parse_from(["convoy", "revert", "web", "-2"]).unwrap();
        assert!(matches!(parsed.command, Commands::Revert { target: -2, .. }));
    }

    #[test]
    fn test_create_splits_instances() {
        let parsed = Harness::try_parse_from([
            "convoy", "create", "web", "-i", "h1:2375,h2:2375", "-c", "web.json",
        ])
        .unwrap();

        match parsed.command {
            Commands::Create { instances, .. } => assert_eq!(instances, vec!["h1:2375", "h2:2375"]),
            _ => panic!("expected create"),
        }
    }
}
