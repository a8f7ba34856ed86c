mod commands;
mod config;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use editing::{DrawMap, HeadlessSurface};
use geocoding::GeometryResolver;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, trace, warn};
use tracing_subscriber::EnvFilter;

use crate::commands::{SessionCommand, HELP};
use crate::config::{Overrides, Settings};

#[derive(Parser, Debug)]
#[command(author, version, about = "Resolve addresses to building outlines and edit them")]
struct Args {
    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve one address and print center and outline as JSON
    Resolve {
        /// Free-form address
        address: String,
    },

    /// Drive an editing session from stdin commands (see `help`)
    Session {
        /// Give rendered outlines a vertex editor instead of click capture
        #[arg(long)]
        native_editor: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut settings = Settings::from_env();
    settings.apply(&args.overrides);

    let resolver = GeometryResolver::from_config(&settings.resolver)?;
    match args.command {
        Command::Resolve { address } => {
            let result = resolver.resolve(&address).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Session { native_editor } => {
            let surface = if native_editor {
                HeadlessSurface::with_vertex_editor()
            } else {
                HeadlessSurface::new()
            };
            let map = DrawMap::new(surface, Arc::new(resolver), settings.draw_map);
            run_session(map).await?;
        }
    }
    Ok(())
}

async fn run_session(
    mut map: DrawMap<HeadlessSurface>,
) -> Result<(), Box<dyn std::error::Error>> {
    let center = map.session().initial_center();
    info!(
        "session started at {:.5},{:.5}, type `help` for commands",
        center.lat, center.lng
    );
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let command = match commands::parse(&line) {
                    Ok(Some(command)) => command,
                    Ok(None) => continue,
                    Err(err) => {
                        warn!("{err}");
                        continue;
                    }
                };
                if command == SessionCommand::Quit {
                    break;
                }
                execute(&mut map, command).await?;
            }
            Some(_) = map.next_event() => {}
        }
        flush_traces(&mut map);
    }

    map.settle().await;
    show(&map)?;
    Ok(())
}

async fn execute(
    map: &mut DrawMap<HeadlessSurface>,
    command: SessionCommand,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        SessionCommand::Address(text) => map.set_address(text),
        SessionCommand::Enable => map.set_resolve_enabled(true),
        SessionCommand::Disable => map.set_resolve_enabled(false),
        SessionCommand::Edit => {
            let mode = map.session_mut().start_edit();
            info!("edit mode: {mode:?}");
        }
        SessionCommand::Click(point) => {
            if let Err(err) = map.session_mut().add_point(point) {
                warn!("{err}");
            }
        }
        SessionCommand::Drag(points) => {
            if let Err(err) = map.session_mut().apply_edited_geometry(points) {
                warn!("{err}");
            }
        }
        SessionCommand::Done => map.session_mut().stop_edit(),
        SessionCommand::Cancel => map.session_mut().cancel_edit(),
        SessionCommand::Wait => {
            map.settle().await;
            show(map)?;
        }
        SessionCommand::Show => show(map)?,
        SessionCommand::Help => println!("{HELP}"),
        SessionCommand::Quit => {}
    }
    Ok(())
}

/// Logs and discards what the session and surface recorded since the last
/// call. Returns the entry count.
fn flush_traces(map: &mut DrawMap<HeadlessSurface>) -> usize {
    let events = map.take_events();
    for event in &events {
        debug!("{event:?}");
    }
    let ops = map.session_mut().surface_mut().take_ops();
    for op in &ops {
        trace!("surface {op:?}");
    }
    events.len() + ops.len()
}

fn show(map: &DrawMap<HeadlessSurface>) -> Result<(), serde_json::Error> {
    let session = map.session();
    let state = json!({
        "address": map.address(),
        "mode": session.mode(),
        "loading": map.is_loading(),
        "ready": map.is_ready(),
        "lastResolvedAddress": session.last_resolved_address(),
        "committed": map.committed(),
        "metrics": map.metrics().snapshot(),
    });
    println!("{}", serde_json::to_string(&state)?);
    Ok(())
}
