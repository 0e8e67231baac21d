// Copyright (C) 2026  Caprica Software Limited
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! The event queue and the single-consumer interpreter loop.
//!
//! One dedicated thread owns every mutable structure: the module
//! registry, the event registry, and the pending continuation. All other
//! threads are producers that enqueue [`QueueItem`]s through a cloned
//! [`InterpreterHandle`]; the mpsc channel is the only cross-thread
//! synchronization in the subsystem.
//!
//! Items are processed strictly in FIFO order, one at a time. Handlers
//! must not block: long-running work belongs on a worker thread that
//! reports back by enqueuing a fresh event. `stop()` is cooperative —
//! the shutdown sentinel drains nothing early, but items that are still
//! behind it when the loop exits are dropped.
//!
//! # Continuations
//!
//! Continuable responses (Question/Select) never cross threads. The loop
//! keeps the pending [`Continuation`] object and hands the host an opaque
//! [`ContinuationToken`]; supplying that token with the next command
//! routes the input into the stored callback instead of dispatch. At most
//! one continuation is pending at a time — issuing a new one supersedes
//! the old token.

use std::{
    collections::BTreeMap,
    sync::{
        Arc, Mutex,
        mpsc::{self, Receiver, Sender},
    },
    thread::{self, JoinHandle},
};

use crate::{
    config::ModuleSetting,
    dispatch,
    error::InterpreterError,
    events::EventRegistry,
    module::{ModuleContext, ModuleManifest, ModuleRegistry},
    response::{Continuation, Response, Tag},
};

/// The host/UI contract. Implemented by the console or window the
/// interpreter serves; all methods are invoked from the loop thread.
pub trait Host: Send + Sync {
    /// Deliver the result of a command. A `Some` continuation token means
    /// the conversation expects another turn: pass the token back with
    /// the next `put_command`.
    fn on_reply(
        &self,
        text: &str,
        tag: Tag,
        continuation: Option<ContinuationToken>,
        prefill: Option<&str>,
    );

    /// Deliver output not tied to a command, such as module load failures.
    fn on_notification(&self, text: &str, tag: Tag);

    /// Open a URL in an external browser.
    fn open_url(&self, _url: &str) {}
}

/// Opaque handle to the pending continuation held by the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContinuationToken(u64);

#[derive(Debug)]
pub(crate) enum QueueItem {
    Command {
        text: String,
        continuation: Option<ContinuationToken>,
    },
    Event {
        name: String,
        args: Vec<String>,
    },
    Shutdown,
}

/// Cloneable producer side of the interpreter: enqueue commands and
/// events from any thread.
#[derive(Clone)]
pub struct InterpreterHandle {
    tx: Sender<QueueItem>,
    live_token: Arc<Mutex<Option<u64>>>,
}

impl InterpreterHandle {
    pub(crate) fn new(tx: Sender<QueueItem>, live_token: Arc<Mutex<Option<u64>>>) -> Self {
        Self { tx, live_token }
    }

    /// Enqueue a command for dispatch, or — when `continuation` is given —
    /// for resumption of the pending conversation.
    ///
    /// The token is validated here, before enqueuing: a token that is not
    /// the currently pending one fails with
    /// [`InterpreterError::StaleContinuation`].
    pub fn put_command(
        &self,
        text: &str,
        continuation: Option<ContinuationToken>,
    ) -> Result<(), InterpreterError> {
        if let Some(token) = continuation {
            let live = self
                .live_token
                .lock()
                .map_err(|_| InterpreterError::Stopped)?;
            if *live != Some(token.0) {
                return Err(InterpreterError::StaleContinuation);
            }
        }
        self.tx
            .send(QueueItem::Command {
                text: text.to_string(),
                continuation,
            })
            .map_err(|_| InterpreterError::Stopped)
    }

    /// Enqueue an arbitrary named event. Unknown names are tolerated at
    /// notify time.
    pub fn put_event(&self, name: &str, args: &[&str]) -> Result<(), InterpreterError> {
        self.tx
            .send(QueueItem::Event {
                name: name.to_string(),
                args: args.iter().map(|a| a.to_string()).collect(),
            })
            .map_err(|_| InterpreterError::Stopped)
    }

    /// Enqueue the shutdown sentinel. Items already queued still run;
    /// items behind the sentinel are dropped when the loop exits.
    pub fn stop(&self) {
        let _ = self.tx.send(QueueItem::Shutdown);
    }
}

/// The interpreter subsystem: owns the loop thread.
pub struct Interpreter {
    handle: InterpreterHandle,
    thread: Option<JoinHandle<()>>,
}

impl Interpreter {
    /// Spawn the loop thread, build every enabled module from the
    /// manifest inside it, and start consuming the queue.
    ///
    /// Per-module load failures are reported through
    /// [`Host::on_notification`]; they never abort startup.
    pub fn spawn(
        manifest: ModuleManifest,
        settings: BTreeMap<String, ModuleSetting>,
        host: Arc<dyn Host>,
    ) -> Self {
        let (tx, rx) = mpsc::channel();
        let live_token = Arc::new(Mutex::new(None));
        let handle = InterpreterHandle::new(tx, Arc::clone(&live_token));

        let loop_handle = handle.clone();
        let thread = thread::spawn(move || {
            let mut state = LoopState::new(loop_handle, host, live_token);
            state.load_modules(manifest, &settings);
            state.run(rx);
        });

        Self {
            handle,
            thread: Some(thread),
        }
    }

    /// A cloneable producer handle for other threads.
    pub fn handle(&self) -> InterpreterHandle {
        self.handle.clone()
    }

    pub fn put_command(
        &self,
        text: &str,
        continuation: Option<ContinuationToken>,
    ) -> Result<(), InterpreterError> {
        self.handle.put_command(text, continuation)
    }

    pub fn put_event(&self, name: &str, args: &[&str]) -> Result<(), InterpreterError> {
        self.handle.put_event(name, args)
    }

    pub fn stop(&self) {
        self.handle.stop();
    }

    /// Wait for the loop thread to finish draining and exit. Call after
    /// [`Interpreter::stop`].
    pub fn join(mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for Interpreter {
    fn drop(&mut self) {
        if let Some(thread) = self.thread.take() {
            self.handle.stop();
            let _ = thread.join();
        }
    }
}

/// Everything the loop thread owns. Nothing in here is shared: producers
/// only reach the loop through the channel and the live-token cell.
struct LoopState {
    handle: InterpreterHandle,
    host: Arc<dyn Host>,
    registry: ModuleRegistry,
    events: EventRegistry,
    pending: Option<(u64, Continuation)>,
    live_token: Arc<Mutex<Option<u64>>>,
    next_token: u64,
}

impl LoopState {
    fn new(
        handle: InterpreterHandle,
        host: Arc<dyn Host>,
        live_token: Arc<Mutex<Option<u64>>>,
    ) -> Self {
        Self {
            handle,
            host,
            registry: ModuleRegistry::new(),
            events: EventRegistry::new(),
            pending: None,
            live_token,
            next_token: 0,
        }
    }

    fn load_modules(&mut self, manifest: ModuleManifest, settings: &BTreeMap<String, ModuleSetting>) {
        let mut ctx = ModuleContext {
            interpreter: self.handle.clone(),
            client: Arc::clone(&self.host),
            events: &mut self.events,
        };
        let failures = self.registry.load_all(manifest, settings, &mut ctx);
        for failure in failures {
            self.host.on_notification(&failure.to_string(), Tag::Error);
        }
    }

    fn run(&mut self, rx: Receiver<QueueItem>) {
        while let Ok(item) = rx.recv() {
            match item {
                QueueItem::Shutdown => {
                    self.events.notify("destroy", &[]);
                    self.registry.destroy_all();
                    break;
                }
                QueueItem::Event { name, args } => {
                    self.events.notify(&name, &args);
                }
                QueueItem::Command { text, continuation } => {
                    let response = self.execute(&text, continuation);
                    self.deliver(response);
                }
            }
        }
        log::debug!("interpreter loop terminated");
    }

    /// Resume the pending conversation if a token was supplied, otherwise
    /// run normal dispatch.
    fn execute(&mut self, text: &str, continuation: Option<ContinuationToken>) -> Response {
        if let Some(token) = continuation {
            match self.pending.take() {
                Some((id, pending)) if id == token.0 => {
                    self.set_live_token(None);
                    return pending.resume(text);
                }
                other => {
                    // Token raced past a newer continuation; put it back.
                    self.pending = other;
                    log::warn!("ignoring stale continuation token {}", token.0);
                    return Response::Error("That conversation has expired".to_string());
                }
            }
        }
        dispatch::dispatch(&mut self.registry, text)
    }

    /// Render the response, perform any side effect, store a continuable
    /// result, and hand the contents to the host.
    fn deliver(&mut self, response: Response) {
        if let Response::Url(url) = &response {
            self.host.open_url(url);
        }

        let contents = response.into_contents();
        let token = contents.continuation.map(|continuation| {
            self.next_token += 1;
            let id = self.next_token;
            // Supersedes any previously pending conversation.
            self.pending = Some((id, continuation));
            self.set_live_token(Some(id));
            ContinuationToken(id)
        });

        self.host
            .on_reply(&contents.text, contents.tag, token, contents.prefill.as_deref());
    }

    fn set_live_token(&self, value: Option<u64>) {
        if let Ok(mut live) = self.live_token.lock() {
            *live = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn put_command_rejects_tokens_that_are_not_pending() {
        let (tx, _rx) = mpsc::channel();
        let live = Arc::new(Mutex::new(Some(7)));
        let handle = InterpreterHandle::new(tx, live);

        assert!(handle.put_command("hello", None).is_ok());
        assert!(handle.put_command("hello", Some(ContinuationToken(7))).is_ok());
        assert!(matches!(
            handle.put_command("hello", Some(ContinuationToken(6))),
            Err(InterpreterError::StaleContinuation)
        ));
    }

    #[test]
    fn enqueuing_after_the_loop_ended_reports_stopped() {
        let (tx, rx) = mpsc::channel();
        let handle = InterpreterHandle::new(tx, Arc::default());
        drop(rx);

        assert!(matches!(
            handle.put_command("hello", None),
            Err(InterpreterError::Stopped)
        ));
        assert!(matches!(
            handle.put_event("tick", &[]),
            Err(InterpreterError::Stopped)
        ));
    }
}
