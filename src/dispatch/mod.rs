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

//! Command dispatch across the module registry.
//!
//! A command string is split on whitespace and each module's command tree
//! is walked in priority order. A handler returning [`Response::Empty`]
//! means "not handled" and the walk moves on; the first non-empty result
//! ends dispatch. A handler fault also ends dispatch, contained as a
//! redacted error response. When nothing matches, the caller gets the
//! generic no-answer reply.

use crate::{
    module::ModuleRegistry,
    response::{NO_ANSWER, Response},
};

pub(crate) fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}

pub(crate) fn dispatch(registry: &mut ModuleRegistry, text: &str) -> Response {
    let tokens = tokenize(text);
    for (id, tree) in registry.trees_mut() {
        match tree.walk(&tokens) {
            None => continue,
            Some(Ok(response)) if response.is_empty() => continue,
            Some(Ok(response)) => return response,
            Some(Err(err)) => {
                return Response::failure(&err.context(format!("command failed in module `{id}`")));
            }
        }
    }
    Response::Reply(NO_ANSWER.to_string())
}
