//! Host console: privileged local commands read from the server's stdin.
//!
//! Console lines never travel on the wire and the host holds no chat
//! username. Output goes to stdout because it is operator UI, not
//! telemetry.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use crate::protocol::command::{self, Input};
use crate::server::state::AppState;

/// Runs the console loop until stdin closes or shutdown fires.
pub async fn run_console(state: Arc<AppState>, shutdown: CancellationToken) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("Host console ready: !mod <name>, !mods, !kick <name>, !dbtest");
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            line = lines.next_line() => match line {
                Ok(Some(line)) => handle_line(&state, line.trim()).await,
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!("console read failed: {}", e);
                    break;
                }
            },
        }
    }
}

async fn handle_line(state: &AppState, line: &str) {
    if line.is_empty() {
        return;
    }
    let Input::Command { verb, args } = command::parse(line) else {
        println!("Console commands start with '!'. Try !mods.");
        return;
    };
    match verb.as_str() {
        "mod" => toggle_moderator(state, args.trim()),
        "mods" => {
            let mods = state.registry().moderators();
            if mods.is_empty() {
                println!("No moderators.");
            } else {
                println!("Moderators: {}", mods.join(", "));
            }
        }
        "kick" => kick(state, args.trim()),
        "dbtest" => {
            if state.users().test_connection().await {
                println!("Database connection OK.");
            } else {
                println!("Database connection FAILED.");
            }
        }
        _ => println!("Unknown console command. Try !mod, !mods, !kick, or !dbtest."),
    }
}

fn toggle_moderator(state: &AppState, name: &str) {
    if name.is_empty() {
        println!("Usage: !mod <name>");
        return;
    }
    match state.registry().toggle_moderator(name) {
        Some((info, true)) => {
            state.reply(info.id, "[Server]: You are now a moderator.");
            println!("{} is now a moderator.", info.username);
        }
        Some((info, false)) => {
            state.reply(info.id, "[Server]: You are no longer a moderator.");
            println!("{} is no longer a moderator.", info.username);
        }
        None => println!("No connected user named '{}'.", name),
    }
}

/// Host kick: force-closes a session, no moderator rights required.
fn kick(state: &AppState, name: &str) {
    if name.is_empty() {
        println!("Usage: !kick <name>");
        return;
    }
    match state.registry().find(name) {
        Some(peer) => {
            state.reply(peer.id, "You were kicked by host.");
            state.registry().cancel(peer.id);
            println!("Kicked {}.", peer.username);
        }
        None => println!("No connected user named '{}'.", name),
    }
}
