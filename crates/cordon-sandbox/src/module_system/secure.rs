// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Security policy decorator: identifier validation and forced secure
//! evaluation.

use std::sync::{Arc, OnceLock};

use regex::Regex;

use crate::error::{Result, SandboxError};
use crate::evaluator::{Factory, SecureEvaluator};
use crate::module_system::cache::FactoryCache;
use crate::module_system::id::ModuleId;
use crate::module_system::loader::Loader;

static SEGMENT: OnceLock<Regex> = OnceLock::new();

/// The strict identifier syntax a path segment must satisfy: word
/// characters only.
fn segment_pattern() -> &'static Regex {
    SEGMENT.get_or_init(|| Regex::new(r"^\w+$").expect("segment pattern"))
}

/// Policy decorator enforcing identifier well-formedness and traversal
/// prevention over a wrapped loader.
///
/// `resolve` rejects any id whose `..` segments would climb above the
/// module root, and any segment outside the strict identifier syntax.
/// `evaluate` always routes through this decorator's own [`SecureEvaluator`]
/// — never the delegate's — which closes off any path by which a
/// less-trusted delegate could substitute an unrestricted compiler. For the
/// same reason the decorator owns its factory cache: every factory it hands
/// out was compiled by its own evaluator.
pub struct SecureLoader {
    inner: Arc<dyn Loader>,
    evaluator: Arc<SecureEvaluator>,
    factories: FactoryCache,
}

impl SecureLoader {
    /// Wraps `inner` with the validation policy and a mandatory evaluator.
    pub fn new(inner: Arc<dyn Loader>, evaluator: Arc<SecureEvaluator>) -> Self {
        Self {
            inner,
            evaluator,
            factories: FactoryCache::new(),
        }
    }
}

impl Loader for SecureLoader {
    fn name(&self) -> &'static str {
        "SecureLoader"
    }

    fn factories(&self) -> &FactoryCache {
        &self.factories
    }

    fn evaluator(&self) -> Option<&SecureEvaluator> {
        Some(&self.evaluator)
    }

    fn resolve(&self, id: &str, base: Option<&ModuleId>) -> Result<ModuleId> {
        let mut segments: Vec<&str> = id.split('/').collect();

        if matches!(segments.first().copied(), Some(".") | Some("..")) {
            let Some(base) = base else {
                return Err(SandboxError::RelativeWithoutBase { id: id.to_string() });
            };
            // splice the relative segments onto the base's directory
            // segments; every `.`/`..` then participates in the walk below,
            // so a single leading `..` from a topmost module is already an
            // escape
            let mut spliced: Vec<&str> = base.as_str().split('/').collect();
            spliced.pop();
            spliced.append(&mut segments);
            segments = spliced;
        }

        // walk left to right, maintaining an accumulator; popping an empty
        // accumulator is the escape above the module root
        let mut accumulated: Vec<&str> = Vec::new();
        for segment in segments {
            if segment == "." {
                continue;
            } else if segment == ".." {
                if accumulated.pop().is_none() {
                    return Err(SandboxError::Traversal { id: id.to_string() });
                }
            } else if !segment_pattern().is_match(segment) {
                return Err(SandboxError::IllegalId { id: id.to_string() });
            } else {
                accumulated.push(segment);
            }
        }

        // the delegate performs the final canonicalization of the
        // now-validated identifier
        self.inner.resolve(id, base)
    }

    fn fetch(&self, id: &ModuleId) -> Result<String> {
        self.inner.fetch(id)
    }

    fn evaluate(&self, text: &str, id: &ModuleId) -> Result<Factory> {
        self.evaluator.evaluate(text, id)
    }
}
