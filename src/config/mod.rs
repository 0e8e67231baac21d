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

//! Interpreter configuration.
//!
//! This module manages the module-set description read once at startup:
//! which modules are enabled and in what priority order they are tried.
//! The file is not hot-reloaded by this subsystem.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

const CONFIG_NAME: &str = "attendant";

/// Per-module startup settings: whether to load the module and where it
/// sits in the dispatch order (ascending priority is tried first).
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleSetting {
    pub enabled: bool,
    pub priority: i32,
}

impl Default for ModuleSetting {
    fn default() -> Self {
        Self {
            enabled: true,
            priority: 0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct InterpreterConfig {
    pub version: u32,
    pub modules: BTreeMap<String, ModuleSetting>,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            version: 1,
            modules: BTreeMap::new(),
        }
    }
}

pub fn load_config() -> InterpreterConfig {
    confy::load(CONFIG_NAME, None).unwrap_or_default()
}

pub fn save_config(cfg: &InterpreterConfig) -> Result<(), confy::ConfyError> {
    confy::store(CONFIG_NAME, None, cfg)
}
