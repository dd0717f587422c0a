// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event handlers: console progress lines, and the remote-mode emitter
//! that frames every event back onto stdout for the calling invocation.

use shine_core::{EventHandler, FsEvent};
use shine_proto::EventMessage;

/// Prints one human line per event.
pub struct ConsoleHandler {
    pub verbose: bool,
}

impl EventHandler for ConsoleHandler {
    fn event_callback(&mut self, event: &FsEvent) {
        let label = event
            .comp
            .as_ref()
            .map(|c| c.label.clone())
            .unwrap_or_else(|| event.compname.clone());
        match event.status.as_str() {
            "start" => {
                if self.verbose {
                    println!("{}: {} {}...", event.node, event.action, label);
                }
            }
            "done" => {
                let info = event
                    .comp
                    .as_ref()
                    .and_then(|c| c.status_info.clone())
                    .map(|info| format!(" ({info})"))
                    .unwrap_or_default();
                println!("{label}: {} done{info}", event.action);
            }
            "failed" => {
                let message = event
                    .result
                    .as_ref()
                    .and_then(|r| r.message.clone())
                    .unwrap_or_else(|| "unknown error".to_string());
                eprintln!("{label}: {} failed: {message}", event.action);
            }
            "timeout" => {
                eprintln!("{label}: {} timed out", event.action);
            }
            _ => {}
        }
    }
}

/// Frames every event on stdout; the parsing side is the proxy action of
/// the calling invocation.
pub struct RemoteHandler;

impl EventHandler for RemoteHandler {
    fn event_callback(&mut self, event: &FsEvent) {
        let mut msg = EventMessage::new(&event.compname, &event.action, &event.status);
        msg.node = Some(event.node.clone());
        msg.comp = event.comp.clone();
        msg.result = event.result.clone();
        match shine_proto::pack(&msg) {
            Ok(line) => println!("{line}"),
            Err(err) => tracing::error!(error = %err, "cannot frame event"),
        }
    }
}
