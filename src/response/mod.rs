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

//! Command results and the interactive message protocol.
//!
//! Every command handler produces a [`Response`]. Most variants are
//! terminal: they render once and the exchange is over. [`Question`] and
//! [`Select`] are the continuable variants: their rendered [`Contents`]
//! carry the object itself as a [`Continuation`], and the interpreter
//! loop retains it so the *next* user input is routed back into the
//! stored callback instead of normal command dispatch.
//!
//! # Multi-turn protocol
//!
//! 1. A handler returns `Response::Question(..)` or `Response::Select(..)`.
//! 2. The loop stores the continuation and hands the host an opaque token.
//! 3. The host passes the token back with the next input; the loop resumes
//!    the stored object, which either finishes with a terminal variant or
//!    yields itself again for another turn.
//!
//! A [`Select`]'s candidate list only ever shrinks, and exactly one
//! candidate always resolves through the stored callback without costing
//! the user a turn, whether narrowing got it there or the list was
//! constructed that way.

use std::{collections::HashMap, fmt};

use anyhow::Result;
use chrono::Local;
use serde_json::Value;

/// Keyword context stored alongside a continuable response and forwarded
/// to its callback on every turn.
pub type Context = HashMap<String, Value>;

/// Callback invoked when a [`Question`] receives its answer. Receives the
/// tokenized follow-up input and the stored keyword context.
pub type QuestionCallback = Box<dyn FnMut(&[String], &Context) -> Result<Response>>;

/// Callback invoked when a [`Select`] resolves to a single candidate.
/// Receives the chosen candidate's payload and the stored keyword context.
pub type SelectCallback = Box<dyn FnMut(&Value, &Context) -> Result<Response>>;

/// Default upper bound on how many candidates a [`Select`] will enumerate.
pub const MAX_SELECT_CHOICES: usize = 30;

/// Reply when a [`Select`] turn is aborted with empty input.
pub const SELECT_ABORTED: &str = "Selection aborted";

/// Reply when a [`Select`] filter leaves no candidates.
pub const SELECT_NOTHING_FOUND: &str = "Nothing found";

/// Reply when no module's tree matches the command.
pub const NO_ANSWER: &str = "I have no answer for that.";

/// The result of a single command execution.
pub enum Response {
    /// Generic acknowledgement, no message of its own.
    Empty,
    /// Timestamped reply text.
    Reply(String),
    /// Timestamped informational text.
    Info(String),
    /// Redacted failure summary. Build via [`Response::failure`] so the
    /// full error chain is logged before it is redacted for display.
    Error(String),
    /// Ask the host to open the URL in an external browser; the rendered
    /// text is a confirmation message.
    Url(String),
    /// A prompt whose answer is routed back into a stored callback.
    Question(Question),
    /// A Question specialised with an ordered candidate list.
    Select(Select),
}

/// Display style attached to rendered contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Reply,
    Info,
    Error,
    Url,
    Question,
}

impl Tag {
    pub fn as_str(self) -> &'static str {
        match self {
            Tag::Reply => "reply",
            Tag::Info => "info",
            Tag::Error => "error",
            Tag::Url => "url",
            Tag::Question => "question",
        }
    }
}

/// A retained continuable response; the next expected turn of a
/// multi-step exchange.
pub enum Continuation {
    Question(Question),
    Select(Select),
}

impl Continuation {
    /// Feed the next user input into the stored conversation.
    pub fn resume(self, input: &str) -> Response {
        match self {
            Continuation::Question(question) => question.resume(input),
            Continuation::Select(select) => select.resume(input),
        }
    }
}

/// Rendered form of a [`Response`]: what to display, how to style it, and
/// whether the conversation continues.
pub struct Contents {
    pub text: String,
    pub tag: Tag,
    pub continuation: Option<Continuation>,
    pub prefill: Option<String>,
}

impl Response {
    /// Whether this response means "not handled" during dispatch.
    pub fn is_empty(&self) -> bool {
        matches!(self, Response::Empty)
    }

    /// Wrap a handler fault as a displayable error.
    ///
    /// The full error chain is logged here; only the outermost message
    /// survives into the displayed text.
    pub fn failure(err: &anyhow::Error) -> Self {
        log::error!("command failed: {err:#}");
        Response::Error(err.to_string())
    }

    /// Render the response for delivery to the host.
    pub fn into_contents(self) -> Contents {
        match self {
            Response::Empty => Contents::terminal("OK".to_string(), Tag::Reply),
            Response::Reply(text) => Contents::terminal(timestamped(&text), Tag::Reply),
            Response::Info(text) => Contents::terminal(timestamped(&text), Tag::Info),
            Response::Error(text) => Contents::terminal(text, Tag::Error),
            Response::Url(url) => Contents::terminal(format!("Opening {url}"), Tag::Url),
            Response::Question(question) => Contents {
                text: question.prompt.clone(),
                tag: Tag::Question,
                prefill: question.prefill.clone(),
                continuation: Some(Continuation::Question(question)),
            },
            Response::Select(mut select) => {
                if select.choices.is_empty() {
                    return Contents::terminal(SELECT_NOTHING_FOUND.to_string(), Tag::Reply);
                }
                // A single candidate never costs the user a turn, even
                // before any narrowing has happened.
                if select.choices.len() == 1 {
                    let (_, payload) = select.choices.remove(0);
                    return select.invoke(&payload).into_contents();
                }
                Contents {
                    text: select.listing(),
                    tag: Tag::Question,
                    prefill: None,
                    continuation: Some(Continuation::Select(select)),
                }
            }
        }
    }
}

impl Contents {
    fn terminal(text: String, tag: Tag) -> Self {
        Self {
            text,
            tag,
            continuation: None,
            prefill: None,
        }
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Empty => write!(f, "Empty"),
            Response::Reply(text) => write!(f, "Reply({text:?})"),
            Response::Info(text) => write!(f, "Info({text:?})"),
            Response::Error(text) => write!(f, "Error({text:?})"),
            Response::Url(url) => write!(f, "Url({url:?})"),
            Response::Question(question) => write!(f, "Question({:?})", question.prompt),
            Response::Select(select) => {
                write!(f, "Select({:?}, {} choices)", select.prompt, select.len())
            }
        }
    }
}

fn timestamped(text: &str) -> String {
    format!("{}  {}", Local::now().format("%H:%M:%S"), text)
}

/// A prompt whose next input is forwarded to a stored callback together
/// with the keyword context captured when the question was asked.
pub struct Question {
    prompt: String,
    prefill: Option<String>,
    context: Context,
    callback: QuestionCallback,
}

impl Question {
    pub fn new(prompt: impl Into<String>, callback: QuestionCallback) -> Self {
        Self {
            prompt: prompt.into(),
            prefill: None,
            context: Context::new(),
            callback,
        }
    }

    /// Text pre-filled into the host's input line for this turn.
    pub fn with_prefill(mut self, prefill: impl Into<String>) -> Self {
        self.prefill = Some(prefill.into());
        self
    }

    /// Store a keyword context entry forwarded to the callback.
    pub fn with_context(mut self, key: impl Into<String>, value: Value) -> Self {
        self.context.insert(key.into(), value);
        self
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Tokenize the answer and invoke the stored callback. A callback
    /// fault is contained here and rendered as an error response.
    pub fn resume(mut self, input: &str) -> Response {
        let tokens: Vec<String> = input.split_whitespace().map(str::to_string).collect();
        match (self.callback)(&tokens, &self.context) {
            Ok(response) => response,
            Err(err) => Response::failure(&err),
        }
    }
}

/// A [`Question`] specialised with an ordered list of `(label, payload)`
/// candidates, narrowed turn by turn until one remains.
pub struct Select {
    prompt: String,
    choices: Vec<(String, Value)>,
    max_choices: usize,
    context: Context,
    callback: SelectCallback,
}

impl Select {
    pub fn new(
        prompt: impl Into<String>,
        callback: SelectCallback,
        choices: Vec<(String, Value)>,
    ) -> Self {
        Self {
            prompt: prompt.into(),
            choices,
            max_choices: MAX_SELECT_CHOICES,
            context: Context::new(),
            callback,
        }
    }

    pub fn with_max_choices(mut self, max_choices: usize) -> Self {
        self.max_choices = max_choices;
        self
    }

    /// Store a keyword context entry forwarded to the callback.
    pub fn with_context(mut self, key: impl Into<String>, value: Value) -> Self {
        self.context.insert(key.into(), value);
        self
    }

    pub fn len(&self) -> usize {
        self.choices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.choices.is_empty()
    }

    /// Run one turn of the selection state machine.
    ///
    /// * Empty input aborts the selection.
    /// * An in-range integer picks that index of the *current* list.
    /// * Anything else is a case-insensitive label filter; the candidate
    ///   list is replaced by the filtered subset, so it only ever shrinks.
    ///
    /// A single remaining candidate resolves immediately via the stored
    /// callback. When several candidates remain the `Select` itself is
    /// returned and stays the active continuation; if they exceed the
    /// configured maximum the listing is suppressed in favour of a
    /// "refine your keyword" message, but the narrowed list still persists
    /// for the next turn.
    pub fn resume(mut self, input: &str) -> Response {
        let input = input.trim();
        if input.is_empty() {
            return Response::Reply(SELECT_ABORTED.to_string());
        }

        if let Ok(index) = input.parse::<usize>() {
            if index < self.choices.len() {
                let (_, payload) = self.choices.remove(index);
                return self.invoke(&payload);
            }
        }

        let needle = input.to_lowercase();
        self.choices
            .retain(|(label, _)| label.to_lowercase().contains(&needle));

        match self.choices.len() {
            0 => Response::Reply(SELECT_NOTHING_FOUND.to_string()),
            1 => {
                let (_, payload) = self.choices.remove(0);
                self.invoke(&payload)
            }
            _ => Response::Select(self),
        }
    }

    fn invoke(&mut self, payload: &Value) -> Response {
        match (self.callback)(payload, &self.context) {
            Ok(response) => response,
            Err(err) => Response::failure(&err),
        }
    }

    /// The prompt plus an enumerated `index. label` listing, or a
    /// refine-your-keyword message when the list is too long to show.
    fn listing(&self) -> String {
        if self.choices.len() > self.max_choices {
            return format!(
                "{}\nToo many options ({}), refine your keyword",
                self.prompt,
                self.choices.len()
            );
        }
        let mut text = self.prompt.clone();
        for (index, (label, _)) in self.choices.iter().enumerate() {
            text.push_str(&format!("\n{index}. {label}"));
        }
        text
    }
}
