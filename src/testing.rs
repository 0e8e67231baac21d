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

//! Shared fixtures for unit tests.

use std::sync::{Arc, mpsc};

use crate::{
    events::EventRegistry,
    interpreter::{ContinuationToken, Host, InterpreterHandle},
    response::{Response, Tag},
    tree::CommandHandler,
};

/// A host that ignores everything.
pub(crate) struct NullHost;

impl Host for NullHost {
    fn on_reply(&self, _: &str, _: Tag, _: Option<ContinuationToken>, _: Option<&str>) {}
    fn on_notification(&self, _: &str, _: Tag) {}
}

/// The pieces a `ModuleContext` needs, as the loop thread would build
/// them. The handle's queue goes nowhere.
pub(crate) fn loop_thread_context() -> (EventRegistry, InterpreterHandle, Arc<dyn Host>) {
    let (tx, rx) = mpsc::channel();
    // Tests drive modules directly; nothing consumes the queue.
    std::mem::forget(rx);
    let handle = InterpreterHandle::new(tx, Arc::default());
    (EventRegistry::new(), handle, Arc::new(NullHost))
}

/// A handler that always replies with fixed text.
pub(crate) fn reply_handler(text: &str) -> CommandHandler {
    let text = text.to_string();
    Box::new(move |_| Ok(Response::Reply(text.clone())))
}
