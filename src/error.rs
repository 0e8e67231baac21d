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

//! Library error type.
//!
//! Faults raised by handlers, listeners, and lifecycle hooks travel as
//! [`anyhow::Error`] and are contained at their dispatch boundaries; this
//! type covers the structural errors the library itself reports to its
//! callers.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InterpreterError {
    /// A module with the same id is already present in the registry.
    #[error("module `{0}` is already loaded")]
    DuplicateModule(String),

    /// The module's `initialize` hook failed; the module was not loaded.
    #[error("module `{id}` failed to initialise: {reason}")]
    ModuleInit { id: String, reason: String },

    /// A command tree root may not hold a default (`""`) entry.
    #[error("a command tree root cannot hold a default entry")]
    RootDefault,

    /// A command path must contain at least one token.
    #[error("empty command path")]
    EmptyPath,

    /// The command path descends through a token that is already bound to
    /// a handler.
    #[error("command path `{0}` passes through an existing command")]
    PathThroughLeaf(String),

    /// The supplied continuation token does not match the pending
    /// conversation (already consumed, superseded, or never issued).
    #[error("unknown or expired continuation token")]
    StaleContinuation,

    /// The interpreter loop has terminated; the item was not enqueued.
    #[error("the interpreter loop has stopped")]
    Stopped,
}
