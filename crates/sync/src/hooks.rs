use std::collections::BTreeSet;

use drift_core::{DeletePolicy, Document, HookPhase};
use smallvec::SmallVec;

use crate::annotations::{self, tokens, AnnotationChain};

pub type PhaseSet = BTreeSet<HookPhase>;
pub type DeletePolicies = SmallVec<[DeletePolicy; 2]>;

/// Maps hook annotations to canonical phases and delete policies.
#[derive(Debug, Clone)]
pub struct HookClassifier {
    phases: AnnotationChain<PhaseSet>,
    delete_policies: AnnotationChain<DeletePolicies>,
}

impl Default for HookClassifier {
    fn default() -> Self {
        Self::new(
            AnnotationChain::new()
                .with(annotations::HOOK, parse_phases)
                .with(annotations::HELM_HOOK, parse_helm_phases),
            AnnotationChain::new()
                .with(annotations::HOOK_DELETE_POLICY, parse_delete_policies)
                .with(annotations::HELM_HOOK_DELETE_POLICY, parse_helm_delete_policies),
        )
    }
}

impl HookClassifier {
    pub fn new(phases: AnnotationChain<PhaseSet>, delete_policies: AnnotationChain<DeletePolicies>) -> Self {
        Self { phases, delete_policies }
    }

    /// Declared hook phases, deduplicated. Empty means "not a hook".
    pub fn classify(&self, doc: &Document) -> PhaseSet {
        self.phases.resolve(doc).unwrap_or_default()
    }

    pub fn is_hook(&self, doc: &Document) -> bool { !self.classify(doc).is_empty() }

    /// Delete policies for a hook; `BeforeHookCreation` when none are declared.
    pub fn delete_policies(&self, doc: &Document) -> DeletePolicies {
        match self.delete_policies.resolve(doc) {
            Some(p) if !p.is_empty() => p,
            _ => SmallVec::from_elem(DeletePolicy::BeforeHookCreation, 1),
        }
    }
}

// A present key always resolves, even to an empty set, so an unusable canonical
// annotation does not fall through to the legacy one.
fn parse_phases(raw: &str) -> Option<PhaseSet> {
    Some(tokens(raw).filter_map(HookPhase::from_token).collect())
}

fn parse_helm_phases(raw: &str) -> Option<PhaseSet> {
    Some(tokens(raw).filter_map(helm_phase).collect())
}

fn helm_phase(token: &str) -> Option<HookPhase> {
    match token {
        "pre-install" | "pre-upgrade" => Some(HookPhase::PreSync),
        "post-install" | "post-upgrade" => Some(HookPhase::PostSync),
        _ => None,
    }
}

fn parse_delete_policies(raw: &str) -> Option<DeletePolicies> {
    Some(dedup(tokens(raw).filter_map(DeletePolicy::from_token)))
}

fn parse_helm_delete_policies(raw: &str) -> Option<DeletePolicies> {
    Some(dedup(tokens(raw).filter_map(|t| match t {
        "hook-succeeded" => Some(DeletePolicy::HookSucceeded),
        "hook-failed" => Some(DeletePolicy::HookFailed),
        "before-hook-creation" => Some(DeletePolicy::BeforeHookCreation),
        _ => None,
    })))
}

fn dedup(it: impl Iterator<Item = DeletePolicy>) -> DeletePolicies {
    it.collect::<BTreeSet<_>>().into_iter().collect()
}
