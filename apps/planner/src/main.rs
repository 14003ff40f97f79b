mod api_client;
mod config;
mod errors;
mod models;
mod notify;
mod planner;
mod session;

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::api_client::HttpTaskApi;
use crate::config::Config;
use crate::errors::ClientError;
use crate::models::ListItem;
use crate::notify::{ChannelNotifier, Notification, Notifier, TracingNotifier};
use crate::planner::controller::{DispatchOutcome, ListController};
use crate::planner::dashboard::{recommendation_headline, Dashboard, PlannerSummary};
use crate::planner::reconcile::Action;
use crate::session::{
    require_session, CommandTokenSource, Session, SessionContext, StaticTokenSource, TokenSource,
};

#[derive(Parser)]
#[command(name = "planner")]
#[command(about = "Daily planner and recommended tasks for your job search")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show today's planner tasks
    Tasks,

    /// Show AI-recommended tasks
    Recommendations,

    /// Accept a recommendation into the daily planner
    Accept { task_id: String },

    /// Dismiss a recommendation
    Dismiss { task_id: String },

    /// Snooze a recommendation until tomorrow
    Snooze { task_id: String },

    /// Mark a planner task as completed
    Complete {
        task_id: String,
        /// Mark the task as not completed instead
        #[arg(long)]
        undo: bool,
    },

    /// Mount both views and print notifications and list updates until Ctrl-C
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting planner client v{}", env!("CARGO_PKG_VERSION"));

    let session = SessionContext::new();
    if let Some(tokens) = token_source(&config) {
        session.sign_in(Session::new(config.user_id.clone(), tokens));
    }
    // Fail early with a sign-in hint instead of silently skipping every call.
    require_session(&session)
        .map_err(|e| anyhow::anyhow!("{e}: set PLANNER_ID_TOKEN or PLANNER_TOKEN_COMMAND"))?;

    let api = Arc::new(HttpTaskApi::new(&config.api_base_url, config.request_timeout)?);
    info!("Task API: {}", config.api_base_url);

    let (channel, notifications) = ChannelNotifier::new();
    let notifier: Arc<dyn Notifier> = match cli.command {
        Commands::Watch => Arc::new(channel),
        _ => Arc::new(TracingNotifier),
    };
    let dashboard = Dashboard::new(api, session, notifier);

    match cli.command {
        Commands::Watch => watch(&dashboard, notifications).await?,
        Commands::Tasks => {
            dashboard.planner().refresh().await?;
            print_planner(&dashboard.planner().items());
        }
        Commands::Recommendations => {
            dashboard.recommendations().refresh().await?;
            print_recommendations(&dashboard.recommendations().items());
        }
        Commands::Accept { task_id } => {
            prefetch(dashboard.recommendations()).await;
            report(dashboard.accept_recommendation(&task_id).await?);
        }
        Commands::Dismiss { task_id } => {
            report(run_action(dashboard.recommendations(), &task_id, Action::Dismiss).await?);
        }
        Commands::Snooze { task_id } => {
            report(run_action(dashboard.recommendations(), &task_id, Action::Snooze).await?);
        }
        Commands::Complete { task_id, undo } => {
            let action = Action::ToggleComplete { completed: !undo };
            report(run_action(dashboard.planner(), &task_id, action).await?);
            print_planner(&dashboard.planner().items());
        }
    }

    Ok(())
}

fn token_source(config: &Config) -> Option<Arc<dyn TokenSource>> {
    if let Some(command) = &config.token_command {
        return Some(Arc::new(CommandTokenSource::new(command.clone())));
    }
    config
        .id_token
        .as_ref()
        .map(|token| Arc::new(StaticTokenSource::new(token.clone())) as Arc<dyn TokenSource>)
}

/// Loads the list so the confirmation can name the task. A failed load only
/// costs the title; the action is still sent.
async fn prefetch(controller: &ListController) {
    if let Err(e) = controller.refresh().await {
        warn!("Could not load {} before the action: {e}", controller.kind().label());
    }
}

async fn run_action(
    controller: &ListController,
    task_id: &str,
    action: Action,
) -> Result<DispatchOutcome, ClientError> {
    prefetch(controller).await;
    controller.dispatch(task_id, action).await
}

fn report(outcome: DispatchOutcome) {
    match outcome {
        DispatchOutcome::Applied { item: Some(item) } => println!("ok: {}", item.title),
        DispatchOutcome::Applied { item: None } => println!("ok"),
        other => println!("skipped: {other:?}"),
    }
}

async fn watch(
    dashboard: &Dashboard,
    mut notifications: UnboundedReceiver<Notification>,
) -> Result<()> {
    let mut planner_changes = dashboard.planner().changes();
    let mut recommendation_changes = dashboard.recommendations().changes();
    let views = dashboard.mount()?;

    loop {
        tokio::select! {
            Some(notification) = notifications.recv() => println!("{notification}"),
            Ok(()) = planner_changes.changed() => print_planner(&dashboard.planner().items()),
            Ok(()) = recommendation_changes.changed() => {
                print_recommendations(&dashboard.recommendations().items())
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    drop(views);
    Ok(())
}

fn print_planner(items: &[ListItem]) {
    println!("Daily Planner - Today: {}", PlannerSummary::of(items));
    for item in items {
        let mark = if item.is_completed() { "x" } else { " " };
        let hint = item
            .scheduling_hint
            .as_deref()
            .map(|h| format!(" ({h})"))
            .unwrap_or_default();
        println!(
            "  [{mark}] {} [{}] [{}] {}{hint}",
            item.id, item.priority, item.category, item.title
        );
    }
}

fn print_recommendations(items: &[ListItem]) {
    println!("Recommended Tasks - {}", recommendation_headline(items.len()));
    for item in items {
        println!(
            "  {} [{}] [{}] {}",
            item.id, item.priority, item.category, item.title
        );
        if !item.description.is_empty() {
            println!("      {}", item.description);
        }
        if let Some(reason) = &item.reason {
            println!("      why: {reason}");
        }
    }
}
