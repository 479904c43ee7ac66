//! Content negotiation over `Accept` and `Content-Type` headers.
//!
//! Candidates are tried in the order they appear in the header, media type parameters
//! (including `q=`) are stripped and ignored, and the first candidate that resolves wins.

use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use tracing::trace;

/// No registered media type matched any candidate of the header.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NegotiationError {
    #[error("none of `{0}` is supported")]
    NotAcceptable(String),
}

/// Registry of instances keyed by canonical media type, plus aliases resolving to them.
pub struct Negotiator<V> {
    encodings: HashMap<String, V>,
    aliases: HashMap<String, String>,
}

impl<V> Negotiator<V> {
    pub fn new() -> Self {
        Self { encodings: HashMap::new(), aliases: HashMap::new() }
    }

    /// Registers `instance` under `mimetype` and makes every alias resolve to it.
    ///
    /// Registering a media type again replaces its instance.
    pub fn register(&mut self, mimetype: impl Into<String>, instance: V, aliases: &[&str]) {
        let mimetype = mimetype.into();
        for alias in aliases {
            self.aliases.insert((*alias).to_owned(), mimetype.clone());
        }
        self.encodings.insert(mimetype, instance);
    }

    /// Resolves the first supported candidate of an `Accept` or `Content-Type` value.
    pub fn get(&self, header: &str) -> Result<&V, NegotiationError> {
        for candidate in header.split(',').map(strip_parameters) {
            if let Some(instance) = self.lookup(candidate) {
                trace!(candidate, "negotiated media type");
                return Ok(instance);
            }
        }
        Err(NegotiationError::NotAcceptable(header.to_owned()))
    }

    /// Looks up one bare media type, directly or through an alias.
    pub fn lookup(&self, mimetype: &str) -> Option<&V> {
        self.encodings.get(mimetype).or_else(|| self.aliases.get(mimetype).and_then(|canonical| self.encodings.get(canonical)))
    }

    pub fn contains(&self, mimetype: &str) -> bool {
        self.lookup(mimetype).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.encodings.is_empty()
    }

    pub fn mimetypes(&self) -> impl Iterator<Item = &str> {
        self.encodings.keys().map(String::as_str)
    }
}

/// Cuts `;` parameters, unless the candidate starts with one, and trims whitespace.
fn strip_parameters(candidate: &str) -> &str {
    match candidate.find(';') {
        Some(index) if index > 0 => candidate[..index].trim(),
        _ => candidate.trim(),
    }
}

impl<V> Default for Negotiator<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> fmt::Debug for Negotiator<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Negotiator").field("mimetypes", &self.encodings.keys()).field("aliases", &self.aliases).finish()
    }
}
