// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.
// Panicking code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
// Debug code that shouldn't be in production
#![deny(clippy::dbg_macro)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use kamailio_operator::actions::{ActionChannel, ActionKind};
use kamailio_operator::config::{ConfigOptions, DesiredConfig};
use kamailio_operator::infrastructure::{
    HookTools, InMemoryConfigSource, InMemoryFileStore, InMemoryStateStore, InMemorySupervisor,
    JsonFileStateStore, LocalFileStore, PebbleClient, ProcessRunner, RecordingActionChannel,
    RecordingIngress, RecordingStatus, RelationIngress,
};
use kamailio_operator::files::FileStore;
use kamailio_operator::{Dispatcher, Event, KamailioCharm, OperatorSettings, Runtime};
use log::{debug, error, info};
use simple_logger::SimpleLogger;

/// Operator for the kamailio SIP server
#[derive(Parser, Debug)]
#[command(name = "kamailio-operator")]
#[command(about = "Reconcile a kamailio workload running under Pebble")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Run against in-memory collaborators instead of the workload
    #[arg(long)]
    dry_run: bool,

    /// Pebble API socket of the workload container
    #[arg(long)]
    pebble_socket: Option<PathBuf>,

    /// Mount point of the workload container's filesystem; files are pushed
    /// through Pebble when unset
    #[arg(long)]
    container_root: Option<PathBuf>,

    /// Recorded state file
    #[arg(long)]
    state_file: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Handle a hook event
    Hook { name: String },
    /// Run an operator action
    Action {
        name: String,
        /// Arguments for the kamctl action
        #[arg(long)]
        args: Option<String>,
    },
}

impl Args {
    fn apply(&self, settings: &mut OperatorSettings) {
        if self.dry_run {
            settings.dry_run = true;
        }
        if let Some(path) = &self.pebble_socket {
            settings.pebble_socket = path.clone();
        }
        if let Some(path) = &self.container_root {
            settings.container_root = Some(path.clone());
        }
        if let Some(path) = &self.state_file {
            settings.state_file = path.clone();
        }
        if let Some(level) = &self.log_level {
            settings.log_level = level.clone();
        }
    }
}

/// Resolve the event from the command line, falling back to the platform's
/// dispatch path. `--args` supplies the kamctl arguments directly.
fn resolve_event(
    dispatcher: &Dispatcher,
    command: Option<&Command>,
    settings: &OperatorSettings,
) -> Result<(Option<Event>, bool)> {
    match command {
        Some(Command::Hook { name }) => Ok((dispatcher.hook(name), false)),
        Some(Command::Action { name, args }) => {
            let event = dispatcher.action(name);
            match (event, args) {
                (Some(Event::Action(ActionKind::Kamctl { .. })), Some(args)) => Ok((
                    Some(Event::Action(ActionKind::Kamctl { args: args.clone() })),
                    true,
                )),
                (event, _) => Ok((event, false)),
            }
        }
        None => match &settings.dispatch_path {
            Some(path) => Ok((dispatcher.resolve(path), false)),
            None => bail!("no event given: pass a subcommand or set JUJU_DISPATCH_PATH"),
        },
    }
}

fn live_runtime(settings: &OperatorSettings) -> Result<(Runtime, Arc<dyn ActionChannel>)> {
    let options = ConfigOptions::embedded().context("Failed to parse embedded charm config")?;
    let tools = Arc::new(HookTools::new(Arc::new(ProcessRunner), options));
    let pebble = Arc::new(PebbleClient::new(&settings.pebble_socket));
    let files: Arc<dyn FileStore> = match &settings.container_root {
        Some(root) => {
            info!("[kamailio] writing files under {}", root.display());
            Arc::new(LocalFileStore::new(root))
        }
        None => pebble.clone(),
    };
    let charm = KamailioCharm::new(
        settings.app_name.clone(),
        pebble,
        files,
        Arc::new(RelationIngress::new(tools.clone())),
    );
    let runtime = Runtime::new(
        charm,
        tools.clone(),
        tools.clone(),
        Arc::new(JsonFileStateStore::new(&settings.state_file)),
        tools.clone(),
    );
    let actions: Arc<dyn ActionChannel> = tools;
    Ok((runtime, actions))
}

fn dry_run_runtime(settings: &OperatorSettings) -> Result<(Runtime, Arc<dyn ActionChannel>)> {
    let config = DesiredConfig::defaults().context("Failed to read config defaults")?;
    let actions = Arc::new(RecordingActionChannel::default());
    let charm = KamailioCharm::new(
        settings.app_name.clone(),
        Arc::new(InMemorySupervisor::new()),
        Arc::new(InMemoryFileStore::new()),
        Arc::new(RecordingIngress::new()),
    );
    let runtime = Runtime::new(
        charm,
        Arc::new(InMemoryConfigSource::new(config)),
        Arc::new(RecordingStatus::new()),
        Arc::new(InMemoryStateStore::new()),
        actions.clone(),
    );
    let actions: Arc<dyn ActionChannel> = actions;
    Ok((runtime, actions))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut settings = OperatorSettings::from_env();
    args.apply(&mut settings);
    settings.validate().context("Invalid operator settings")?;

    SimpleLogger::new()
        .with_level(settings.level_filter()?)
        .init()
        .context("Failed to initialize logger")?;
    debug!("settings: {settings:?}");

    let dispatcher = Dispatcher::new();
    let (event, has_params) = resolve_event(&dispatcher, args.command.as_ref(), &settings)?;
    let Some(event) = event else {
        info!("[kamailio] no handler for this event, nothing to do");
        return Ok(());
    };

    let (runtime, actions) = if settings.dry_run {
        info!("[kamailio] dry run, using in-memory collaborators");
        dry_run_runtime(&settings)?
    } else {
        live_runtime(&settings)?
    };

    let event = if has_params {
        event
    } else {
        event
            .with_params(actions.as_ref())
            .await
            .context("Failed to read action parameters")?
    };

    let name = event.to_string();
    if let Err(e) = runtime.handle(event).await {
        error!("[kamailio] {name} failed: {e}");
        return Err(e).with_context(|| format!("Failed to handle {name}"));
    }
    Ok(())
}
