//! Memoization of method resolution.
//!
//! A [`MethodCache`] is owned by whoever creates it and passed to the code
//! that resolves methods; there is no process-wide cache. Lookups take a
//! read lock. Concurrent first lookups of the same key may both resolve,
//! but resolution is deterministic and the first stored outcome wins, so
//! every caller observes the same result.
//!
//! Names that match no method are never stored. Property names arrive from
//! sheets and configuration, so the map stays bounded by the method tables.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::logging::targets;
use crate::meta::{MetaObject, MethodMeta, ParamQuery, ResolveError};

type CacheKey = (TypeId, String, ParamQuery);

/// Counters describing cache effectiveness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Resolution outcomes keyed by (type, method name, parameter query).
///
/// Ambiguous resolutions are cached along with successes. A lookup that finds
/// no method is resolved again every time.
#[derive(Debug, Default)]
pub struct MethodCache {
    entries: RwLock<HashMap<CacheKey, Result<&'static MethodMeta, ResolveError>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MethodCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `name` on `meta`, reusing an earlier outcome when present.
    pub fn resolve(
        &self,
        meta: &'static MetaObject,
        name: &str,
        query: &ParamQuery,
    ) -> Result<&'static MethodMeta, ResolveError> {
        let key = (meta.type_id, name.to_owned(), query.clone());
        if let Some(outcome) = self.entries.read().get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return outcome.clone();
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let outcome = meta.resolve(name, query);
        if matches!(outcome, Err(ResolveError::MethodNotFound { .. })) {
            return outcome;
        }
        tracing::trace!(
            target: targets::RESOLVE,
            type_name = meta.type_name,
            name,
            ok = outcome.is_ok(),
            "caching resolution"
        );
        self.entries.write().entry(key).or_insert(outcome).clone()
    }

    /// Number of cached outcomes.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop every cached outcome. Counters are kept.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}
