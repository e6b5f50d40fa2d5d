//! Ordered annotation fallback chains.
//!
//! Canonical and legacy keys are listed together with their parsers; the first key
//! whose parser yields a value wins. Adding a key never touches call sites.

use drift_core::{annotation, Document};

pub const HOOK: &str = "argocd.argoproj.io/hook";
pub const HOOK_DELETE_POLICY: &str = "argocd.argoproj.io/hook-delete-policy";
pub const SYNC_WAVE: &str = "argocd.argoproj.io/sync-wave";

pub const HELM_HOOK: &str = "helm.sh/hook";
pub const HELM_HOOK_DELETE_POLICY: &str = "helm.sh/hook-delete-policy";
pub const HELM_HOOK_WEIGHT: &str = "helm.sh/hook-weight";

pub type Parser<T> = fn(&str) -> Option<T>;

#[derive(Clone)]
pub struct AnnotationChain<T> {
    links: Vec<(String, Parser<T>)>,
}

impl<T> AnnotationChain<T> {
    pub fn new() -> Self { Self { links: Vec::new() } }

    /// Append a lower-priority key.
    pub fn with(mut self, key: impl Into<String>, parser: Parser<T>) -> Self {
        self.links.push((key.into(), parser));
        self
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ { self.links.iter().map(|(k, _)| k.as_str()) }

    /// First value produced by a present annotation whose parser accepts it.
    pub fn resolve(&self, doc: &Document) -> Option<T> {
        self.links
            .iter()
            .find_map(|(key, parse)| annotation(doc, key).and_then(|raw| parse(raw)))
    }
}

impl<T> Default for AnnotationChain<T> {
    fn default() -> Self { Self::new() }
}

impl<T> std::fmt::Debug for AnnotationChain<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.keys()).finish()
    }
}

/// Split a comma-separated annotation value into trimmed, non-empty tokens.
pub fn tokens(raw: &str) -> impl Iterator<Item = &str> + '_ {
    raw.split(',').map(str::trim).filter(|t| !t.is_empty())
}
