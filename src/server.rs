//! JSON-lines front end for a navigation session.
//!
//! One request per stdin line, e.g. `{"cmd":"next"}`, `{"cmd":"type","text":"Get"}`,
//! `{"cmd":"switch","file":"src/other.rs"}`. Render, jump, hide and report
//! instructions are written to stdout, one JSON object per line.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use tracing::debug;

use crate::config::Config;
use crate::provider::PresentationSink;
use crate::render::RenderFrame;
use crate::session::{Command, Session, SessionEvent};
use crate::symbol::{BufferId, JumpTarget};
use crate::syntax::TreeSitterProvider;

/// Editor signals; everything else on the wire is a [`Command`].
#[derive(Debug, Deserialize)]
#[serde(tag = "cmd", rename_all = "kebab-case")]
enum Signal {
    Changed,
    Saved,
    Switch { file: PathBuf },
    Refresh,
    Quit,
}

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
enum Outbound<'a> {
    Render(&'a RenderFrame),
    Jump(&'a JumpTarget),
    Hide,
    Report { message: &'a str },
    Error { message: String },
}

fn emit(msg: &Outbound<'_>) {
    let Ok(line) = serde_json::to_string(msg) else { return };
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let _ = writeln!(out, "{line}");
    let _ = out.flush();
}

/// Writes presentation instructions to stdout.
pub struct StdoutSink;

impl PresentationSink for StdoutSink {
    fn render(&self, frame: &RenderFrame) {
        emit(&Outbound::Render(frame));
    }

    fn hide(&self) {
        emit(&Outbound::Hide);
    }

    fn jump(&self, target: &JumpTarget) {
        emit(&Outbound::Jump(target));
    }

    fn report(&self, message: &str) {
        emit(&Outbound::Report { message });
    }
}

/// Resolve a path parameter: if absolute, use as-is; otherwise join to root.
fn resolve_path(root: &Path, p: &Path) -> PathBuf {
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        root.join(p)
    }
}

fn parse_request(line: &str, root: &Path) -> Result<SessionEvent, String> {
    if let Ok(signal) = serde_json::from_str::<Signal>(line) {
        return Ok(match signal {
            Signal::Changed => SessionEvent::ContentChanged,
            Signal::Saved => SessionEvent::Saved,
            Signal::Switch { file } => SessionEvent::BufferSwitched(BufferId::new(resolve_path(root, &file))),
            Signal::Refresh => SessionEvent::Refresh,
            Signal::Quit => SessionEvent::Shutdown,
        });
    }
    serde_json::from_str::<Command>(line)
        .map(SessionEvent::Command)
        .map_err(|e| format!("Invalid request: {e}"))
}

/// Blocking stdin reader; dropping the sender at EOF ends the session.
fn spawn_stdin_reader(root: PathBuf, tx: UnboundedSender<SessionEvent>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }
            match parse_request(&line, &root) {
                Ok(event) => {
                    let quit = event == SessionEvent::Shutdown;
                    if tx.send(event).is_err() || quit {
                        break;
                    }
                }
                Err(message) => emit(&Outbound::Error { message }),
            }
        }
        debug!("stdin closed");
    });
}

pub fn run_stdio_session(root: PathBuf, file: PathBuf, config: Config) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    let provider = Rc::new(TreeSitterProvider::new(&root, config.namespace.clone()));
    let buffer = BufferId::new(resolve_path(&root, &file));
    let (tx, rx) = unbounded_channel();
    spawn_stdin_reader(root, tx);

    let session = Session::new(buffer, provider.clone(), Rc::new(StdoutSink), config).with_fallback(provider);
    runtime.block_on(session.run(rx));
    Ok(())
}
