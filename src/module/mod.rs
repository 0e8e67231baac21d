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

//! Pluggable feature modules and their registry.
//!
//! A [`Module`] contributes a [`CommandTree`] plus optional lifecycle
//! hooks. Modules are declared in a [`ModuleManifest`] (id → factory) and
//! intersected with the configuration map at startup: disabled entries are
//! skipped, the rest are loaded ascending by priority. The same priority
//! also fixes command-dispatch order, with registration order breaking
//! ties.
//!
//! Module state belongs to the module instance. Tree handlers typically
//! share it through `Rc<RefCell<..>>`; nothing here needs to be `Send`
//! because modules are constructed and driven entirely on the interpreter
//! loop thread. Only the factories cross threads.

use std::{collections::BTreeMap, sync::Arc};

use anyhow::Result;

use crate::{
    config::ModuleSetting,
    error::InterpreterError,
    events::EventRegistry,
    interpreter::{Host, InterpreterHandle},
    tree::CommandTree,
};

/// Host-injected references available to lifecycle hooks.
pub struct ModuleContext<'a> {
    /// Handle for enqueuing further commands or events.
    pub interpreter: InterpreterHandle,
    /// The host client (console/window) this interpreter serves.
    pub client: Arc<dyn Host>,
    /// Listener registry, mutable only during lifecycle calls.
    pub events: &'a mut EventRegistry,
}

/// A pluggable feature unit.
pub trait Module {
    /// Stable identity; duplicate ids fail the later load.
    fn id(&self) -> &str;

    /// Build this module's command tree. Called once, after `initialize`.
    fn commands(&mut self) -> CommandTree;

    /// Startup hook. An error aborts loading this module only.
    fn initialize(&mut self, _ctx: &mut ModuleContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Shutdown hook. Errors are logged, never propagated.
    fn destroy(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Builds a module instance on the interpreter loop thread.
pub type ModuleFactory = Box<dyn FnOnce() -> Box<dyn Module> + Send>;

/// Config-driven module declaration: id → factory.
#[derive(Default)]
pub struct ModuleManifest {
    factories: Vec<(String, ModuleFactory)>,
}

impl ModuleManifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, id: impl Into<String>, factory: ModuleFactory) {
        self.factories.push((id.into(), factory));
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.factories.iter().map(|(id, _)| id.as_str())
    }
}

struct LoadedModule {
    id: String,
    priority: i32,
    tree: CommandTree,
    module: Box<dyn Module>,
}

/// Ordered collection of loaded modules.
#[derive(Default)]
pub struct ModuleRegistry {
    modules: Vec<LoadedModule>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load one module: reject duplicates, run `initialize`, build the
    /// command tree, and slot the module into ascending priority order
    /// (ties keep registration order).
    pub fn load(
        &mut self,
        mut module: Box<dyn Module>,
        priority: i32,
        ctx: &mut ModuleContext<'_>,
    ) -> Result<(), InterpreterError> {
        let id = module.id().to_string();
        if self.is_loaded(&id) {
            return Err(InterpreterError::DuplicateModule(id));
        }

        if let Err(err) = module.initialize(ctx) {
            return Err(InterpreterError::ModuleInit {
                id,
                reason: format!("{err:#}"),
            });
        }

        let tree = module.commands();
        log::debug!("loaded module `{id}` at priority {priority}");
        self.modules.push(LoadedModule {
            id,
            priority,
            tree,
            module,
        });
        self.modules.sort_by_key(|m| m.priority);
        Ok(())
    }

    /// Load every enabled manifest entry, ascending by configured
    /// priority. Each load is its own fault boundary: a failure is
    /// collected and the remaining modules still load.
    pub fn load_all(
        &mut self,
        manifest: ModuleManifest,
        settings: &BTreeMap<String, ModuleSetting>,
        ctx: &mut ModuleContext<'_>,
    ) -> Vec<InterpreterError> {
        let mut pending: Vec<(String, ModuleFactory, i32)> = manifest
            .factories
            .into_iter()
            .filter_map(|(id, factory)| match settings.get(&id) {
                Some(setting) if setting.enabled => Some((id, factory, setting.priority)),
                Some(_) => {
                    log::debug!("module `{id}` is disabled");
                    None
                }
                None => {
                    log::debug!("module `{id}` has no configuration entry, skipping");
                    None
                }
            })
            .collect();
        pending.sort_by_key(|(_, _, priority)| *priority);

        let mut failures = Vec::new();
        for (id, factory, priority) in pending {
            let module = factory();
            if let Err(err) = self.load(module, priority, ctx) {
                log::error!("failed to load module `{id}`: {err}");
                failures.push(err);
            }
        }
        failures
    }

    /// Unload one module, running its `destroy` hook. Returns whether the
    /// module was present.
    pub fn unload(&mut self, id: &str) -> bool {
        let Some(position) = self.modules.iter().position(|m| m.id == id) else {
            return false;
        };
        let mut loaded = self.modules.remove(position);
        if let Err(err) = loaded.module.destroy() {
            log::warn!("module `{id}` destroy hook failed: {err:#}");
        }
        true
    }

    /// Destroy every module, in dispatch order. Hook failures are logged.
    pub fn destroy_all(&mut self) {
        for mut loaded in self.modules.drain(..) {
            if let Err(err) = loaded.module.destroy() {
                log::warn!("module `{}` destroy hook failed: {err:#}", loaded.id);
            }
        }
    }

    pub fn is_loaded(&self, id: &str) -> bool {
        self.modules.iter().any(|m| m.id == id)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Loaded module ids in dispatch order.
    pub fn ids(&self) -> Vec<&str> {
        self.modules.iter().map(|m| m.id.as_str()).collect()
    }

    /// Command trees in dispatch order, for the dispatcher's walk.
    pub(crate) fn trees_mut(&mut self) -> impl Iterator<Item = (&str, &mut CommandTree)> {
        self.modules
            .iter_mut()
            .map(|m| (m.id.as_str(), &mut m.tree))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::Tag;
    use crate::testing::{loop_thread_context, reply_handler};
    use std::{cell::RefCell, rc::Rc};

    struct StubModule {
        id: &'static str,
        reply: &'static str,
        fail_init: bool,
        destroyed: Rc<RefCell<bool>>,
    }

    impl StubModule {
        fn boxed(id: &'static str, reply: &'static str) -> Box<dyn Module> {
            Box::new(Self {
                id,
                reply,
                fail_init: false,
                destroyed: Rc::new(RefCell::new(false)),
            })
        }
    }

    impl Module for StubModule {
        fn id(&self) -> &str {
            self.id
        }

        fn commands(&mut self) -> CommandTree {
            let mut tree = CommandTree::new();
            tree.insert(&["hello"], reply_handler(self.reply)).unwrap();
            tree
        }

        fn initialize(&mut self, _ctx: &mut ModuleContext<'_>) -> Result<()> {
            if self.fail_init {
                anyhow::bail!("no backend available");
            }
            Ok(())
        }

        fn destroy(&mut self) -> Result<()> {
            *self.destroyed.borrow_mut() = true;
            Ok(())
        }
    }

    fn settings(entries: &[(&str, bool, i32)]) -> BTreeMap<String, ModuleSetting> {
        entries
            .iter()
            .map(|(id, enabled, priority)| {
                (
                    id.to_string(),
                    ModuleSetting {
                        enabled: *enabled,
                        priority: *priority,
                    },
                )
            })
            .collect()
    }

    #[test]
    fn duplicate_id_fails_that_load_only() {
        let (mut events, handle, host) = loop_thread_context();
        let mut ctx = ModuleContext {
            interpreter: handle,
            client: host,
            events: &mut events,
        };
        let mut registry = ModuleRegistry::new();

        registry
            .load(StubModule::boxed("echo", "one"), 1, &mut ctx)
            .unwrap();
        let err = registry
            .load(StubModule::boxed("echo", "two"), 2, &mut ctx)
            .unwrap_err();
        assert!(matches!(err, InterpreterError::DuplicateModule(id) if id == "echo"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn init_failure_is_scoped_to_that_module() {
        let (mut events, handle, host) = loop_thread_context();
        let mut ctx = ModuleContext {
            interpreter: handle,
            client: host,
            events: &mut events,
        };

        let mut manifest = ModuleManifest::new();
        manifest.register(
            "broken",
            Box::new(|| {
                Box::new(StubModule {
                    id: "broken",
                    reply: "?",
                    fail_init: true,
                    destroyed: Rc::new(RefCell::new(false)),
                }) as Box<dyn Module>
            }),
        );
        manifest.register("echo", Box::new(|| StubModule::boxed("echo", "pong")));

        let mut registry = ModuleRegistry::new();
        let failures = registry.load_all(
            manifest,
            &settings(&[("broken", true, 1), ("echo", true, 2)]),
            &mut ctx,
        );
        assert_eq!(failures.len(), 1);
        assert!(failures[0].to_string().contains("broken"));
        assert!(failures[0].to_string().contains("no backend available"));
        assert_eq!(registry.ids(), vec!["echo"]);
    }

    #[test]
    fn disabled_and_unconfigured_modules_are_skipped() {
        let (mut events, handle, host) = loop_thread_context();
        let mut ctx = ModuleContext {
            interpreter: handle,
            client: host,
            events: &mut events,
        };

        let mut manifest = ModuleManifest::new();
        manifest.register("on", Box::new(|| StubModule::boxed("on", "a")));
        manifest.register("off", Box::new(|| StubModule::boxed("off", "b")));
        manifest.register("unknown", Box::new(|| StubModule::boxed("unknown", "c")));

        let mut registry = ModuleRegistry::new();
        let failures = registry.load_all(
            manifest,
            &settings(&[("on", true, 1), ("off", false, 2)]),
            &mut ctx,
        );
        assert!(failures.is_empty());
        assert_eq!(registry.ids(), vec!["on"]);
    }

    #[test]
    fn dispatch_order_is_priority_then_registration() {
        let (mut events, handle, host) = loop_thread_context();
        let mut ctx = ModuleContext {
            interpreter: handle,
            client: host,
            events: &mut events,
        };
        let mut registry = ModuleRegistry::new();

        registry
            .load(StubModule::boxed("late", "l"), 9, &mut ctx)
            .unwrap();
        registry
            .load(StubModule::boxed("first-tie", "f"), 2, &mut ctx)
            .unwrap();
        registry
            .load(StubModule::boxed("second-tie", "s"), 2, &mut ctx)
            .unwrap();
        registry
            .load(StubModule::boxed("early", "e"), 1, &mut ctx)
            .unwrap();

        assert_eq!(
            registry.ids(),
            vec!["early", "first-tie", "second-tie", "late"]
        );
    }

    #[test]
    fn unload_runs_the_destroy_hook() {
        let (mut events, handle, host) = loop_thread_context();
        let mut ctx = ModuleContext {
            interpreter: handle,
            client: host,
            events: &mut events,
        };
        let destroyed = Rc::new(RefCell::new(false));
        let module = Box::new(StubModule {
            id: "echo",
            reply: "pong",
            fail_init: false,
            destroyed: Rc::clone(&destroyed),
        });

        let mut registry = ModuleRegistry::new();
        registry.load(module, 1, &mut ctx).unwrap();
        assert!(registry.unload("echo"));
        assert!(*destroyed.borrow());
        assert!(!registry.unload("echo"));
        assert!(registry.is_empty());
    }

    #[test]
    fn loaded_trees_answer_commands() {
        let (mut events, handle, host) = loop_thread_context();
        let mut ctx = ModuleContext {
            interpreter: handle,
            client: host,
            events: &mut events,
        };
        let mut registry = ModuleRegistry::new();
        registry
            .load(StubModule::boxed("echo", "pong"), 1, &mut ctx)
            .unwrap();

        let tokens = vec!["hello".to_string()];
        let (_, tree) = registry.trees_mut().next().unwrap();
        let response = tree.walk(&tokens).unwrap().unwrap();
        let contents = response.into_contents();
        assert_eq!(contents.tag, Tag::Reply);
        assert!(contents.text.ends_with("pong"));
    }
}
