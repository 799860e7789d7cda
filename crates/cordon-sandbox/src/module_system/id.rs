// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Canonical module identifiers.

use std::fmt;

/// A normalized, slash-separated module identifier.
///
/// Canonical ids contain no `.` or `..` segments and are the sole cache key
/// for both factories and exports. They are normally produced by a loader's
/// `resolve`; a loader implementation constructs them after normalization
/// and never stores a raw identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleId(String);

impl ModuleId {
    /// Wraps an already-normalized identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The slash-separated segments of the identifier.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// The directory portion: everything up to the last segment.
    ///
    /// The topmost module has no directory, expressed as `"."` so that a
    /// relative join lands beside it.
    pub fn dirname(&self) -> &str {
        match self.0.rsplit_once('/') {
            Some((dir, _)) => dir,
            None => ".",
        }
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ModuleId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
