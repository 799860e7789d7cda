// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! File-backed module loading with mtime-based cache invalidation.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use dashmap::DashMap;

use crate::error::{Result, SandboxError};
use crate::evaluator::SecureEvaluator;
use crate::module_system::cache::FactoryCache;
use crate::module_system::id::ModuleId;
use crate::module_system::loader::{self, Loader};

/// Loader resolving identifiers against an ordered list of filesystem
/// roots and extension suffixes.
///
/// Staleness is detected by timestamp, not content hash: two saves within
/// the same timestamp resolution are not detected as changed.
pub struct FileLoader {
    paths: Vec<PathBuf>,
    extensions: Vec<String>,
    platform: String,
    debug: bool,
    evaluator: Option<Arc<SecureEvaluator>>,
    factories: FactoryCache,
    stamps: DashMap<ModuleId, SystemTime>,
}

impl FileLoader {
    /// Creates a loader over an ordered list of search-path roots, with the
    /// default extension list (`""`, then `".js"`).
    pub fn new(paths: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
            extensions: vec![String::new(), ".js".to_string()],
            platform: std::env::consts::OS.to_string(),
            debug: false,
            evaluator: None,
            factories: FactoryCache::new(),
            stamps: DashMap::new(),
        }
    }

    /// Replaces the ordered extension list.
    pub fn with_extensions(mut self, extensions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the platform token substituted for `{platform}` in identifiers.
    /// Explicit configuration keeps resolution deterministic and testable.
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    /// Enables reload logging.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Configures the ambient secure evaluator.
    pub fn with_evaluator(mut self, evaluator: Arc<SecureEvaluator>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    /// Pre-seeds the factory memo.
    pub fn with_factories(mut self, factories: FactoryCache) -> Self {
        self.factories = factories;
        self
    }

    /// The configured search-path roots, in precedence order.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// The configured extension suffixes, in precedence order.
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Textually canonicalizes an identifier: substitutes the `{platform}`
    /// token, then collapses `.`, `..` and duplicate separators. Pure — the
    /// filesystem is not consulted.
    pub fn normalize(&self, id: &str) -> ModuleId {
        let id = id.replace("{platform}", &format!("platforms/{}", self.platform));
        let mut parts: Vec<&str> = Vec::new();
        for part in id.split('/') {
            match part {
                "" | "." => continue,
                ".." => {
                    if !parts.is_empty() && parts.last() != Some(&"..") {
                        parts.pop();
                    } else {
                        parts.push("..");
                    }
                }
                p => parts.push(p),
            }
        }
        ModuleId::new(parts.join("/"))
    }

    /// Locates the file backing a canonical id: for each search-path root
    /// in order, each extension in order, the first existing candidate
    /// wins. Every extension of a root is exhausted before the next root is
    /// tried.
    pub fn find(&self, id: &ModuleId) -> Result<PathBuf> {
        for root in &self.paths {
            for extension in &self.extensions {
                let candidate = root.join(format!("{}{}", id, extension));
                if candidate.exists() {
                    return Ok(candidate);
                }
            }
        }
        Err(SandboxError::NotFound { id: id.to_string() })
    }

    fn mtime(&self, id: &ModuleId) -> Result<SystemTime> {
        Ok(fs::metadata(self.find(id)?)?.modified()?)
    }
}

impl Loader for FileLoader {
    fn name(&self) -> &'static str {
        "FileLoader"
    }

    fn factories(&self) -> &FactoryCache {
        &self.factories
    }

    fn evaluator(&self) -> Option<&SecureEvaluator> {
        self.evaluator.as_deref()
    }

    fn resolve(&self, id: &str, base: Option<&ModuleId>) -> Result<ModuleId> {
        let id = if id.starts_with('.') {
            match base {
                Some(base) => format!("{}/{}", base.dirname(), id),
                None => id.to_string(),
            }
        } else {
            id.to_string()
        };
        Ok(self.normalize(&id))
    }

    fn fetch(&self, id: &ModuleId) -> Result<String> {
        Ok(fs::read_to_string(self.find(id)?)?)
    }

    fn load(&self, id: &ModuleId) -> Result<crate::evaluator::Factory> {
        // a stale stamp forces re-evaluation before the memoized load
        if let Some(stamp) = self.stamps.get(id).map(|entry| *entry) {
            if stamp < self.mtime(id)? {
                self.reload(id)?;
            }
        }
        loader::load_memoized(self, id)
    }

    fn reload(&self, id: &ModuleId) -> Result<()> {
        if self.debug && self.stamps.contains_key(id) {
            tracing::debug!("reloaded module '{}'", id);
        }
        // stamp before fetching, so the staleness comparison in `load`
        // never misses a write that lands mid-reload
        self.stamps.insert(id.clone(), self.mtime(id)?);
        loader::reload_memoized(self, id)
    }
}
