// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The sandbox execution engine: module graph orchestration, cycle
//! handling, capability freezing.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use cordon_engine::{ObjectRef, Value, deep_freeze};
use parking_lot::RwLock;

use crate::error::{Result, SandboxError};
use crate::module_system::{Loader, ModuleCache, ModuleId};

/// Options for assembling a [`Sandbox`].
#[derive(Default)]
pub struct SandboxOptions {
    /// The loader serving this sandbox's module universe. Required;
    /// construction fails without one.
    pub loader: Option<Arc<dyn Loader>>,
    /// Seed value coerced and deep-frozen into the shared environment.
    pub system: Value,
    /// A pre-seeded module cache.
    pub modules: Option<ModuleCache>,
    /// Enables indented enter/exit trace lines around module execution.
    pub debug: bool,
}

struct Inner {
    loader: Arc<dyn Loader>,
    modules: ModuleCache,
    environment: Value,
    debug: bool,
    main: RwLock<Option<String>>,
    depth: AtomicUsize,
}

/// A module system: resolves, executes and memoizes modules against one
/// loader, injecting each factory with a frozen environment and a
/// per-module require closure.
///
/// Execution is strictly synchronous; `require` calls recurse as nested
/// call-stack frames. Cyclic requires are resolved structurally — the
/// exports placeholder enters the module cache before its factory runs, so
/// a cycle observes the same partially-populated object instead of
/// recursing forever.
///
/// The handle is cheap to clone; clones share one module cache.
#[derive(Clone)]
pub struct Sandbox {
    inner: Arc<Inner>,
}

impl Sandbox {
    /// Assembles a sandbox from options.
    ///
    /// Fails with a configuration error when no loader is provided. The
    /// `system` seed is coerced to an object when nullish and deep-frozen;
    /// it is immutable for the rest of the sandbox's life.
    pub fn new(options: SandboxOptions) -> Result<Self> {
        let loader = options.loader.ok_or_else(|| {
            SandboxError::Configuration(
                "sandbox cannot operate without a loader, either explicitly provided \
                 as an option, or implicitly provided by the enclosing sandbox"
                    .to_string(),
            )
        })?;

        let system = match options.system {
            Value::Undefined | Value::Null => Value::object(),
            other => other,
        };
        let environment = deep_freeze(system);

        Ok(Self {
            inner: Arc::new(Inner {
                loader,
                modules: options.modules.unwrap_or_default(),
                environment,
                debug: options.debug,
                main: RwLock::new(None),
                depth: AtomicUsize::new(0),
            }),
        })
    }

    /// Resolves and executes a module, returning its exports.
    ///
    /// A call without a `base` defines the program's entry module id —
    /// every such call, not only the first, which preserves re-entrant
    /// top-level invocation. With `force` set, both the factory memo and
    /// the module cache are bypassed for this id.
    pub fn invoke(&self, id: &str, base: Option<&ModuleId>, force: bool) -> Result<Value> {
        if base.is_none() {
            *self.inner.main.write() = Some(id.to_string());
        }

        let id = self.inner.loader.resolve(id, base)?;

        if !self.inner.modules.has(&id) || force {
            let depth = self.inner.depth.fetch_add(1, Ordering::Relaxed) + 1;
            if self.inner.debug {
                tracing::debug!("{} {}", "+".repeat(depth), id);
            }

            let outcome = self.execute(&id, force);
            self.inner.depth.fetch_sub(1, Ordering::Relaxed);

            if let Err(error) = outcome {
                // a failed module is never memoized; the next invoke is a
                // clean retry
                self.inner.modules.delete(&id);
                return Err(error);
            }

            if self.inner.debug {
                tracing::debug!("{} {}", "-".repeat(depth), id);
            }
        }

        self.inner
            .modules
            .get(&id)
            .ok_or_else(|| SandboxError::NotFound { id: id.to_string() })
    }

    /// Re-executes a module, bypassing both caches for its id.
    pub fn force(&self, id: &str, base: Option<&ModuleId>) -> Result<Value> {
        self.invoke(id, base, true)
    }

    /// Purges the module cache. The loader's factory cache is untouched.
    pub fn clear(&self) {
        self.inner.modules.clear();
    }

    /// The program's entry module id, as given to the defining `invoke`.
    pub fn main(&self) -> Option<String> {
        self.inner.main.read().clone()
    }

    /// The loader serving this sandbox.
    pub fn loader(&self) -> &Arc<dyn Loader> {
        &self.inner.loader
    }

    /// The shared frozen environment.
    pub fn environment(&self) -> &Value {
        &self.inner.environment
    }

    /// The module cache, for introspection.
    pub fn modules(&self) -> &ModuleCache {
        &self.inner.modules
    }

    fn execute(&self, id: &ModuleId, force: bool) -> Result<()> {
        // placeholder before execution: a cyclic require of this id sees a
        // live, if incomplete, exports object
        let exports = Value::object();
        self.inner.modules.set(id.clone(), exports.clone());

        if force {
            self.inner.loader.reload(id)?;
        }
        let factory = self.inner.loader.load(id)?;
        let require = Require::new(self, id.clone());

        let this = ObjectRef::new();
        this.freeze();

        factory(
            Value::Object(this),
            &require,
            exports,
            &self.inner.environment,
        )
    }
}

/// The per-module `require` closure.
///
/// Constructed fresh for each module execution and immutable from then on:
/// sandboxed code cannot rebind the loader reference or the main-module
/// pointer.
pub struct Require {
    sandbox: Sandbox,
    id: ModuleId,
    main: Option<String>,
    loader: Arc<dyn Loader>,
}

impl Require {
    fn new(sandbox: &Sandbox, id: ModuleId) -> Self {
        Self {
            main: sandbox.main(),
            loader: sandbox.inner.loader.clone(),
            sandbox: sandbox.clone(),
            id,
        }
    }

    /// Requires `id` relative to the owning module.
    ///
    /// Errors come back annotated with the owning module's id, so a deep
    /// failure carries the chain of requiring ids.
    pub fn call(&self, id: &str, force: bool) -> Result<Value> {
        self.sandbox
            .invoke(id, Some(&self.id), force)
            .map_err(|error| error.within(&self.id))
    }

    /// Requires `id`, bypassing both caches.
    pub fn force(&self, id: &str) -> Result<Value> {
        self.call(id, true)
    }

    /// Canonical id of the owning module.
    pub fn id(&self) -> &ModuleId {
        &self.id
    }

    /// The loader shared by every module in the sandbox.
    pub fn loader(&self) -> &Arc<dyn Loader> {
        &self.loader
    }

    /// The program's entry module id.
    pub fn main(&self) -> Option<&str> {
        self.main.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::{NativeEngine, SecureEvaluator};
    use crate::module_system::FactoryCache;
    use cordon_engine::EngineError;

    /// In-memory loader over the engine registry: every registered id
    /// resolves, fetch hands back a placeholder source.
    struct StaticLoader {
        factories: FactoryCache,
        evaluator: Arc<SecureEvaluator>,
    }

    impl StaticLoader {
        fn new(engine: Arc<NativeEngine>) -> Self {
            Self {
                factories: FactoryCache::new(),
                evaluator: Arc::new(SecureEvaluator::new(engine)),
            }
        }
    }

    impl Loader for StaticLoader {
        fn name(&self) -> &'static str {
            "StaticLoader"
        }

        fn factories(&self) -> &FactoryCache {
            &self.factories
        }

        fn evaluator(&self) -> Option<&SecureEvaluator> {
            Some(&self.evaluator)
        }

        fn resolve(&self, id: &str, base: Option<&ModuleId>) -> Result<ModuleId> {
            let joined = match (id.starts_with('.'), base) {
                (true, Some(base)) => format!("{}/{}", base.dirname(), id),
                _ => id.to_string(),
            };
            let mut parts: Vec<&str> = Vec::new();
            for part in joined.split('/') {
                match part {
                    "" | "." => continue,
                    ".." => {
                        parts.pop();
                    }
                    p => parts.push(p),
                }
            }
            Ok(ModuleId::new(parts.join("/")))
        }

        fn fetch(&self, id: &ModuleId) -> Result<String> {
            Ok(format!("// {}", id))
        }
    }

    fn sandbox_over(engine: Arc<NativeEngine>) -> Sandbox {
        sandbox_with_system(engine, Value::Undefined)
    }

    fn sandbox_with_system(engine: Arc<NativeEngine>, system: Value) -> Sandbox {
        Sandbox::new(SandboxOptions {
            loader: Some(Arc::new(StaticLoader::new(engine))),
            system,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_requires_a_loader() {
        let err = Sandbox::new(SandboxOptions::default()).err().unwrap();
        assert!(matches!(err, SandboxError::Configuration(_)));
    }

    #[test]
    fn test_exports_are_memoized() {
        let engine = Arc::new(NativeEngine::new());
        engine.register("main", |_, _, exports, _| {
            exports
                .as_object()
                .expect("exports object")
                .set("value", Value::Number(1.0))?;
            Ok(())
        });

        let sandbox = sandbox_over(engine);
        let first = sandbox.invoke("main", None, false).unwrap();
        let second = sandbox.invoke("main", None, false).unwrap();

        // identical exports reference, not a structural copy
        assert_eq!(first, second);
    }

    #[test]
    fn test_force_reexecutes() {
        let engine = Arc::new(NativeEngine::new());
        engine.register("main", |_, _, exports, _| {
            exports
                .as_object()
                .expect("exports object")
                .set("value", Value::Number(1.0))?;
            Ok(())
        });

        let sandbox = sandbox_over(engine);
        let first = sandbox.invoke("main", None, false).unwrap();
        let forced = sandbox.invoke("main", None, true).unwrap();

        assert_ne!(first, forced);
    }

    #[test]
    fn test_failed_module_is_not_memoized() {
        let engine = Arc::new(NativeEngine::new());
        engine.register("broken", |_, _, _, _| {
            Err(SandboxError::Runtime("factory exploded".to_string()))
        });

        let sandbox = sandbox_over(engine);
        let err = sandbox.invoke("broken", None, false).unwrap_err();
        assert!(matches!(err, SandboxError::Runtime(_)));
        assert!(sandbox.modules().is_empty());
    }

    #[test]
    fn test_failed_module_retries_cleanly() {
        let engine = Arc::new(NativeEngine::new());
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        engine.register("flaky", move |_, _, exports, _| {
            if counter.fetch_add(1, Ordering::Relaxed) == 0 {
                return Err(SandboxError::Runtime("first attempt fails".to_string()));
            }
            exports
                .as_object()
                .expect("exports object")
                .set("ok", Value::Boolean(true))?;
            Ok(())
        });

        let sandbox = sandbox_over(engine);
        assert!(sandbox.invoke("flaky", None, false).is_err());

        let exports = sandbox.invoke("flaky", None, false).unwrap();
        assert_eq!(
            exports.as_object().unwrap().get("ok"),
            Some(Value::Boolean(true))
        );
        assert_eq!(attempts.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_cyclic_requires_observe_placeholder() {
        let engine = Arc::new(NativeEngine::new());
        engine.register("a", |_, require, exports, _| {
            exports
                .as_object()
                .expect("exports object")
                .set("name", Value::String("a".into()))?;
            // b requires a back while a is still executing
            let b = require.call("b", false)?;
            let seen = b.as_object().expect("b exports").get("saw_a_name");
            exports
                .as_object()
                .expect("exports object")
                .set("b_saw", seen.unwrap_or(Value::Undefined))?;
            Ok(())
        });
        engine.register("b", |_, require, exports, _| {
            let a = require.call("a", false)?;
            // a's exports are incomplete but live
            let name = a.as_object().expect("a exports").get("name");
            exports
                .as_object()
                .expect("exports object")
                .set("saw_a_name", name.unwrap_or(Value::Undefined))?;
            Ok(())
        });

        let sandbox = sandbox_over(engine);
        let a = sandbox.invoke("a", None, false).unwrap();
        assert_eq!(
            a.as_object().unwrap().get("b_saw"),
            Some(Value::String("a".into()))
        );
    }

    #[test]
    fn test_environment_is_frozen() {
        let engine = Arc::new(NativeEngine::new());
        engine.register("prober", |_, _, exports, environment| {
            let env = environment.as_object().expect("environment object");
            let outcome = env.set("a", Value::Number(10.0));
            exports
                .as_object()
                .expect("exports object")
                .set("write_failed", Value::Boolean(outcome.is_err()))?;
            Ok(())
        });

        let seed = ObjectRef::new();
        seed.set("print", Value::function("print", |_| Ok(Value::Undefined)))
            .unwrap();
        let sandbox = sandbox_with_system(engine, Value::Object(seed));

        let exports = sandbox.invoke("prober", None, false).unwrap();
        assert_eq!(
            exports.as_object().unwrap().get("write_failed"),
            Some(Value::Boolean(true))
        );
    }

    #[test]
    fn test_this_is_frozen() {
        let engine = Arc::new(NativeEngine::new());
        engine.register("prober", |this, _, exports, _| {
            let this = this.as_object().expect("this object");
            let outcome = this.set("a", Value::Number(10.0));
            assert!(matches!(
                outcome,
                Err(EngineError::FrozenWrite { .. })
            ));
            exports
                .as_object()
                .expect("exports object")
                .set("checked", Value::Boolean(true))?;
            Ok(())
        });

        let sandbox = sandbox_over(engine);
        let exports = sandbox.invoke("prober", None, false).unwrap();
        assert_eq!(
            exports.as_object().unwrap().get("checked"),
            Some(Value::Boolean(true))
        );
    }

    #[test]
    fn test_require_error_carries_chain() {
        let engine = Arc::new(NativeEngine::new());
        engine.register("main", |_, require, _, _| {
            require.call("pkg/mid", false)?;
            Ok(())
        });
        engine.register("pkg/mid", |_, require, _, _| {
            require.call("pkg/leaf", false)?;
            Ok(())
        });
        engine.register("pkg/leaf", |_, _, _, _| {
            Err(SandboxError::Runtime("leaf exploded".to_string()))
        });

        let sandbox = sandbox_over(engine);
        let err = sandbox.invoke("main", None, false).unwrap_err();
        assert_eq!(err.to_string(), "leaf exploded in pkg/mid in main");

        // nothing along the failed chain was memoized
        assert!(sandbox.modules().is_empty());
    }

    #[test]
    fn test_main_is_recorded() {
        let engine = Arc::new(NativeEngine::new());
        engine.register("entry", |_, require, exports, _| {
            exports.as_object().expect("exports object").set(
                "main",
                require
                    .main()
                    .map(|main| Value::String(main.to_string()))
                    .unwrap_or(Value::Undefined),
            )?;
            Ok(())
        });

        let sandbox = sandbox_over(engine);
        let exports = sandbox.invoke("entry", None, false).unwrap();
        assert_eq!(sandbox.main().as_deref(), Some("entry"));
        assert_eq!(
            exports.as_object().unwrap().get("main"),
            Some(Value::String("entry".into()))
        );
    }

    #[test]
    fn test_clear_leaves_factory_cache() {
        let engine = Arc::new(NativeEngine::new());
        engine.register("main", |_, _, _, _| Ok(()));

        let sandbox = sandbox_over(engine);
        sandbox.invoke("main", None, false).unwrap();
        assert_eq!(sandbox.loader().factories().len(), 1);

        sandbox.clear();
        assert!(sandbox.modules().is_empty());
        assert_eq!(sandbox.loader().factories().len(), 1);
    }
}
