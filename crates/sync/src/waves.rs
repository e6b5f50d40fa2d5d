use drift_core::{Document, Wave};

use crate::annotations::{self, AnnotationChain};

/// Resolves the sync wave of a resource. Missing or malformed values fall through the
/// chain and finally default to 0.
#[derive(Debug, Clone)]
pub struct WaveResolver {
    chain: AnnotationChain<Wave>,
}

impl Default for WaveResolver {
    fn default() -> Self {
        Self::new(
            AnnotationChain::new()
                .with(annotations::SYNC_WAVE, parse_wave)
                .with(annotations::HELM_HOOK_WEIGHT, parse_wave),
        )
    }
}

impl WaveResolver {
    pub fn new(chain: AnnotationChain<Wave>) -> Self { Self { chain } }

    pub fn resolve(&self, doc: &Document) -> Wave { self.chain.resolve(doc).unwrap_or(0) }
}

/// Base-10 signed integer, no surrounding whitespace.
pub fn parse_wave(raw: &str) -> Option<Wave> { raw.parse::<Wave>().ok() }
