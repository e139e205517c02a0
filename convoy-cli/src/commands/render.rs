//! Terminal rendering of applications and progress

use colored::*;
use convoy_core::domain::application::Application;
use convoy_core::domain::deployment::Deployment;
use convoy_core::domain::progress::{ProgressEvent, ProgressStatus};

/// Print one progress line as it arrives
pub fn print_event(event: &ProgressEvent) {
    let instance = event.instance.as_deref().unwrap_or_default();

    match event.status {
        ProgressStatus::Starting => println!("{} {}", "▸".cyan(), event.message.bold()),
        ProgressStatus::Complete => println!("  {}", "done".dimmed()),
        ProgressStatus::Ok => println!(
            "  {} [{}/{}] {} {}",
            "✓".green(),
            event.item,
            event.total,
            instance.cyan(),
            event.message.dimmed()
        ),
        ProgressStatus::Warning => println!(
            "  {} [{}/{}] {} {}",
            "!".yellow(),
            event.item,
            event.total,
            instance.cyan(),
            event.message.yellow()
        ),
        ProgressStatus::Error => println!(
            "  {} [{}/{}] {} {} {}",
            "✗".red(),
            event.item,
            event.total,
            instance.cyan(),
            event.code.to_string().red(),
            event.message.red()
        ),
        ProgressStatus::Success | ProgressStatus::Failure => {}
    }
}

pub fn print_application(app: &Application) {
    let state = if app.active {
        "running".green()
    } else {
        "stopped".yellow()
    };
    let deployment = if app.has_deployment() {
        app.current_deployment.to_string()
    } else {
        "none".to_string()
    };

    println!("  {} {} ({})", "▸".cyan(), app.name.bold(), state);
    println!("    ID:         {}", app.id.to_string().dimmed());
    println!("    Deployment: {}", deployment.dimmed());
    println!(
        "    Instances:  {}",
        app.instances.as_slice().join(", ").dimmed()
    );
    println!();
}

pub fn print_deployment(deployment: &Deployment, current: bool) {
    let marker = if current { "●".green() } else { "○".dimmed() };
    let image = deployment.command.image().unwrap_or("<no image>");

    println!(
        "  {} {} {} {} {}",
        marker,
        deployment.id.to_string().cyan(),
        deployment
            .date
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed(),
        image.bold(),
        deployment.creator.dimmed()
    );
}
