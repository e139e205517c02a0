//! Application command handlers

use anyhow::{Context, Result};
use colored::*;
use convoy_client::{ClientError, ConvoyClient};
use convoy_core::domain::progress::ProgressEvent;
use convoy_core::dto::application::{CreateApplication, UpdateApplication};
use serde_json::Value as JsonValue;

use super::render::{print_application, print_deployment, print_event};

/// Arguments of `convoy update`
pub struct UpdateArgs {
    pub add: Vec<String>,
    pub remove: Vec<String>,
    pub command: Option<String>,
    pub restart: bool,
    pub force_pull: bool,
}

/// Read a `containers/create` body from a JSON file
fn read_command(path: &str) -> Result<JsonValue> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read command file: {}", path))?;

    serde_json::from_str(&content)
        .with_context(|| format!("Command file {} is not valid JSON", path))
}

pub async fn create(
    client: &ConvoyClient,
    name: String,
    instances: Vec<String>,
    command_path: &str,
    force_pull: bool,
) -> Result<()> {
    let req = CreateApplication {
        name,
        instances: instances.into(),
        command: read_command(command_path)?,
        force_pull,
    };

    println!("{}", format!("Creating {}...", req.name).bold());
    let verdict = client.create_application(&req, print_event).await?;

    println!("{}", format!("✓ {}", verdict.message).green().bold());
    Ok(())
}

pub async fn list(client: &ConvoyClient) -> Result<()> {
    let apps = client.list_applications().await?;

    if apps.is_empty() {
        println!("{}", "No applications found.".yellow());
        return Ok(());
    }

    println!("{}", format!("Found {} application(s):", apps.len()).bold());
    println!();
    for app in &apps {
        print_application(app);
    }

    Ok(())
}

pub async fn show(client: &ConvoyClient, id: &str) -> Result<()> {
    let app = client.get_application(id).await?;
    print_application(&app);
    Ok(())
}

pub async fn history(client: &ConvoyClient, id: &str) -> Result<()> {
    let app = client.get_application(id).await?;
    let deployments = client.application_history(id).await?;

    if deployments.is_empty() {
        println!("{}", format!("{} was never deployed.", app.name).yellow());
        return Ok(());
    }

    println!(
        "{}",
        format!("{} deployment(s) of {}:", deployments.len(), app.name).bold()
    );
    for deployment in &deployments {
        print_deployment(deployment, deployment.id == app.current_deployment);
    }

    Ok(())
}

pub async fn start(client: &ConvoyClient, id: &str) -> Result<()> {
    println!("{}", format!("Starting {}...", id).bold());
    settle(client.start_application(id, print_event).await)
}

pub async fn stop(client: &ConvoyClient, id: &str) -> Result<()> {
    println!("{}", format!("Stopping {}...", id).bold());
    settle(client.stop_application(id, print_event).await)
}

pub async fn revert(client: &ConvoyClient, id: &str, target: i64) -> Result<()> {
    println!("{}", format!("Reverting {} to {}...", id, target).bold());
    settle(client.revert_application(id, target, print_event).await)
}

pub async fn update(client: &ConvoyClient, id: &str, args: UpdateArgs) -> Result<()> {
    let command = args.command.as_deref().map(read_command).transpose()?;
    let req = UpdateApplication {
        add: args.add.into(),
        remove: args.remove.into(),
        command,
        restart: args.restart,
        force_pull: args.force_pull,
    };

    if req.is_noop() {
        anyhow::bail!("Nothing to update: pass --add, --remove, --command or --restart");
    }

    println!("{}", format!("Updating {}...", id).bold());
    match client.update_application(id, &req, print_event).await? {
        Some(verdict) => println!("{}", format!("✓ {}", verdict.message).green().bold()),
        None => println!("{}", format!("{} is already up to date.", id).yellow()),
    }

    Ok(())
}

/// Report the verdict of a state change
fn settle(result: convoy_client::Result<ProgressEvent>) -> Result<()> {
    match result {
        Ok(verdict) => {
            println!("{}", format!("✓ {}", verdict.message).green().bold());
            Ok(())
        }
        Err(ClientError::NotModified) => {
            println!("{}", "Already in the requested state.".yellow());
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
