//! Project reference cache.
//!
//! The `projects` table maps human tags (`Lake Residence`) to bracketed
//! codes (`[LR166]`). [`ProjectResolver`] keeps one immutable snapshot of
//! that table behind an `RwLock`, reloads it synchronously once the TTL has
//! elapsed and never lets a failed reload drop the previous snapshot.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

use rusqlite::types::Value as SqlValue;
use serde::Serialize;

use crate::engine::ReadOnlyEngine;
use crate::error::GatewayError;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);
pub const DEFAULT_MAPPING_CONTEXT_ITEMS: usize = 200;

pub const PROJECTS_QUERY: &str = "SELECT project_tag, project_code FROM projects \
     WHERE project_tag IS NOT NULL AND project_code IS NOT NULL";

/// Lookup tables built together from one read of `projects`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProjectMapping {
    /// Lowercased tag or code to canonical code.
    lookup: BTreeMap<String, String>,
    /// Canonical code to the first tag seen for it.
    display: BTreeMap<String, String>,
}

impl ProjectMapping {
    pub fn from_pairs<I, T, C>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (T, C)>,
        T: AsRef<str>,
        C: AsRef<str>,
    {
        let mut mapping = Self::default();
        for (tag, code) in pairs {
            let tag = tag.as_ref().trim();
            let code = code.as_ref().trim();
            if tag.is_empty() || code.is_empty() {
                continue;
            }

            mapping.lookup.insert(tag.to_lowercase(), code.to_string());
            mapping.lookup.insert(code.to_lowercase(), code.to_string());
            mapping
                .display
                .entry(code.to_string())
                .or_insert_with(|| tag.to_string());
        }
        mapping
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }

    #[must_use]
    pub fn key_count(&self) -> usize {
        self.lookup.len()
    }

    #[must_use]
    pub fn code_count(&self) -> usize {
        self.display.len()
    }

    /// Exact, case-insensitive lookup of a tag or code.
    #[must_use]
    pub fn lookup(&self, tag_or_code: &str) -> Option<&str> {
        self.lookup
            .get(&tag_or_code.trim().to_lowercase())
            .map(String::as_str)
    }

    #[must_use]
    pub fn display_tag(&self, code: &str) -> Option<&str> {
        self.display.get(code).map(String::as_str)
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.display.keys().map(String::as_str)
    }

    /// Finds the code whose tag or code occurs in `text`. The longest
    /// matching key wins; a tie between different codes yields `None`.
    #[must_use]
    pub fn resolve_text(&self, text: &str) -> Option<&str> {
        let haystack = text.to_lowercase();
        let mut best_len = 0;
        let mut candidates = BTreeSet::new();
        for (key, code) in &self.lookup {
            if key.len() < best_len || !haystack.contains(key.as_str()) {
                continue;
            }
            if key.len() > best_len {
                best_len = key.len();
                candidates.clear();
            }
            candidates.insert(code.as_str());
        }

        if candidates.len() > 1 {
            tracing::debug!(
                text,
                candidates = ?candidates,
                "ambiguous project reference"
            );
            return None;
        }
        candidates.into_iter().next()
    }

    /// Accepts both `[LR166]` and the bare `LR166`.
    #[must_use]
    pub fn display_name(&self, code: &str) -> Option<&str> {
        let key = code.trim();
        if key.is_empty() {
            return None;
        }
        if let Some(tag) = self.display_tag(key) {
            return Some(tag);
        }
        if key.starts_with('[') && key.ends_with(']') {
            return None;
        }
        self.display_tag(&format!("[{key}]"))
    }

    /// One `- tag -> code` line per code, at most `max_items` lines.
    #[must_use]
    pub fn context_lines(&self, max_items: usize) -> String {
        self.display
            .iter()
            .filter(|(code, tag)| !tag.eq_ignore_ascii_case(code))
            .take(max_items)
            .map(|(code, tag)| format!("- {tag} -> {code}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Where mapping snapshots come from.
pub trait MappingSource {
    fn load(&self) -> Result<ProjectMapping, GatewayError>;
}

impl<S: MappingSource + ?Sized> MappingSource for Arc<S> {
    fn load(&self) -> Result<ProjectMapping, GatewayError> {
        (**self).load()
    }
}

/// Reads `projects` through the read-only engine.
#[derive(Debug, Clone)]
pub struct SqliteMappingSource {
    engine: ReadOnlyEngine,
}

impl SqliteMappingSource {
    #[must_use]
    pub fn new(engine: ReadOnlyEngine) -> Self {
        Self { engine }
    }
}

impl MappingSource for SqliteMappingSource {
    fn load(&self) -> Result<ProjectMapping, GatewayError> {
        let rows = self.engine.execute(PROJECTS_QUERY, &[])?;
        let pairs = rows.iter().filter_map(|row| {
            let tag = row.get_index(0).and_then(text_of)?;
            let code = row.get_index(1).and_then(text_of)?;
            Some((tag, code))
        });
        Ok(ProjectMapping::from_pairs(pairs))
    }
}

fn text_of(value: &SqlValue) -> Option<String> {
    match value {
        SqlValue::Text(text) => Some(text.clone()),
        SqlValue::Integer(number) => Some(number.to_string()),
        SqlValue::Real(number) => Some(number.to_string()),
        SqlValue::Null | SqlValue::Blob(_) => None,
    }
}

pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub loads: u64,
    pub reload_failures: u64,
    pub hits: u64,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    mapping: Arc<ProjectMapping>,
    loaded_at: Instant,
}

pub struct ProjectResolver<S, C = SystemClock> {
    source: S,
    clock: C,
    ttl: Duration,
    entry: RwLock<Option<CacheEntry>>,
    reload_guard: Mutex<()>,
    loads: AtomicU64,
    reload_failures: AtomicU64,
    hits: AtomicU64,
}

impl<S: MappingSource> ProjectResolver<S> {
    pub fn new(source: S, ttl: Duration) -> Self {
        Self::with_clock(source, ttl, SystemClock)
    }
}

impl<S: MappingSource, C: Clock> ProjectResolver<S, C> {
    pub fn with_clock(source: S, ttl: Duration, clock: C) -> Self {
        Self {
            source,
            clock,
            ttl,
            entry: RwLock::new(None),
            reload_guard: Mutex::new(()),
            loads: AtomicU64::new(0),
            reload_failures: AtomicU64::new(0),
            hits: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Current snapshot, reloading first when it is missing or stale. Only
    /// one caller reloads at a time; the others wait and reuse its result.
    pub fn get_mapping(&self) -> Arc<ProjectMapping> {
        if let Some(mapping) = self.fresh_mapping() {
            return mapping;
        }

        let _reloading = self
            .reload_guard
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(mapping) = self.fresh_mapping() {
            return mapping;
        }
        self.reload()
    }

    pub fn resolve_text(&self, text: &str) -> Option<String> {
        self.get_mapping().resolve_text(text).map(str::to_string)
    }

    pub fn display_name(&self, code: &str) -> Option<String> {
        self.get_mapping().display_name(code).map(str::to_string)
    }

    pub fn mapping_context(&self, max_items: usize) -> String {
        self.get_mapping().context_lines(max_items)
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            loads: self.loads.load(Ordering::Relaxed),
            reload_failures: self.reload_failures.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
        }
    }

    fn fresh_mapping(&self) -> Option<Arc<ProjectMapping>> {
        let now = self.clock.now();
        let entry = self.entry.read().unwrap_or_else(PoisonError::into_inner);
        let entry = entry.as_ref()?;
        if now.saturating_duration_since(entry.loaded_at) >= self.ttl {
            return None;
        }
        self.hits.fetch_add(1, Ordering::Relaxed);
        Some(Arc::clone(&entry.mapping))
    }

    fn reload(&self) -> Arc<ProjectMapping> {
        let started_at = self.clock.now();
        match self.source.load() {
            Ok(mapping) => {
                self.loads.fetch_add(1, Ordering::Relaxed);
                tracing::info!(
                    keys = mapping.key_count(),
                    codes = mapping.code_count(),
                    "project mapping loaded"
                );
                let mapping = Arc::new(mapping);
                let mut entry = self.entry.write().unwrap_or_else(PoisonError::into_inner);
                *entry = Some(CacheEntry {
                    mapping: Arc::clone(&mapping),
                    loaded_at: started_at,
                });
                mapping
            }
            Err(error) => {
                self.reload_failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(%error, "project mapping reload failed, keeping previous snapshot");
                let entry = self.entry.read().unwrap_or_else(PoisonError::into_inner);
                entry
                    .as_ref()
                    .map(|entry| Arc::clone(&entry.mapping))
                    .unwrap_or_default()
            }
        }
    }
}
