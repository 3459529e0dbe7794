use crate::error::Result;
use crate::parser::{Template, parse};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Thread-safe store of parsed templates keyed by their source text.
///
/// Entries are inserted once and never mutated, so lookups only take the read lock.
#[derive(Debug, Default)]
pub struct TemplateCache {
    entries: RwLock<HashMap<String, Arc<Template>>>,
}

impl TemplateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the parsed tree for `source`, parsing and storing it on first use.
    ///
    /// Parsing happens outside the lock. When two threads race on the same
    /// source, the first insert wins and both get the same `Arc`.
    ///
    /// # Errors
    ///
    /// Returns the parse error. Failed parses are not cached.
    pub fn get_or_parse(&self, source: &str) -> Result<Arc<Template>> {
        if let Some(template) = self.entries.read().get(source) {
            tracing::debug!(len = source.len(), "template cache hit");
            return Ok(Arc::clone(template));
        }

        tracing::debug!(len = source.len(), "template cache miss");
        let parsed = Arc::new(parse(source)?);
        let mut entries = self.entries.write();
        let template = entries.entry(source.to_string()).or_insert(parsed);
        Ok(Arc::clone(template))
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}
