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

//! # Attendant.
//!
//! Command interpreter and module-dispatch core for a console-fronted
//! personal assistant. Users type short whitespace-tokenized commands;
//! pluggable feature modules route them through per-module command trees
//! and answer with a displayable [`Response`]. Continuable responses
//! ([`Question`]/[`Select`]) turn a result into the parser for the *next*
//! input, giving multi-turn confirmations and disambiguation menus.
//!
//! ## Architecture
//!
//! * The **interpreter loop** is a single dedicated consumer thread; it
//!   alone mutates the module and event registries, so no locking guards
//!   them. Communication in is a `std::sync::mpsc` queue fed by cloned
//!   [`InterpreterHandle`]s from any producer thread.
//! * **Modules** are declared in a [`ModuleManifest`] and loaded once at
//!   startup against the configuration map, ascending by priority; the
//!   same order fixes dispatch order.
//! * **Dispatch** walks each module's [`CommandTree`] until one handler
//!   yields a non-empty result; every handler, listener, and lifecycle
//!   hook is its own fault boundary, so a failing plugin degrades to an
//!   error message rather than taking the loop down.
//!
//! This crate is a library consumed by a host process; the host supplies
//! a [`Host`] implementation for display and side effects.

pub mod config;
mod dispatch;
pub mod error;
pub mod events;
pub mod interpreter;
pub mod module;
pub mod response;
pub mod tree;

#[cfg(test)]
pub(crate) mod testing;

pub use error::InterpreterError;
pub use events::{EventContext, EventListener, EventRegistry};
pub use interpreter::{ContinuationToken, Host, Interpreter, InterpreterHandle};
pub use module::{Module, ModuleContext, ModuleFactory, ModuleManifest, ModuleRegistry};
pub use response::{
    Contents, Context, Continuation, MAX_SELECT_CHOICES, NO_ANSWER, Question, QuestionCallback,
    Response, SELECT_ABORTED, SELECT_NOTHING_FOUND, Select, SelectCallback, Tag,
};
pub use tree::{CommandHandler, CommandTree, Completion};
