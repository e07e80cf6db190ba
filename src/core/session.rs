// This module provides arena-based session management for encoding runs, following the
// same pattern the surrounding ecosystem uses for compilation sessions: the caller owns
// a bumpalo arena, the EncodingSession borrows it, and everything with a session lifetime
// (interned label names) is allocated there. Interior mutability through RefCell keeps
// the session shareable by reference while backends record emission statistics into it.
// EmitStats tracks words emitted, resolver auxiliary words, per-family strategy hits,
// and label/branch counts; the validation harness reads these to sanity-check stream
// shapes without decoding every word. The session is optional: backends work without one,
// and nothing here participates in encoding semantics.

//! Arena-backed encoding session and emission statistics.

use bumpalo::Bump;
use hashbrown::HashMap;
use std::cell::RefCell;

use super::config::OpFamily;

/// Emission statistics for one encoding session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmitStats {
    /// Total instruction words appended.
    pub words_emitted: usize,
    /// Auxiliary words emitted by the addressing resolver (tier 2/3 materialization).
    pub aux_words: usize,
    /// Capability-family emissions, by strategy-selected family.
    pub family_hits: [usize; OpFamily::COUNT],
    /// Branch instructions emitted.
    pub branches: usize,
    /// Labels bound.
    pub labels_bound: usize,
}

impl EmitStats {
    pub fn hits(&self, family: OpFamily) -> usize {
        self.family_hits[family.index()]
    }
}

/// Arena-backed encoding session.
///
/// Borrows a caller-owned arena; label names and any other session-lifetime
/// data live there. Backends hold an optional reference and record stats.
#[derive(Debug)]
pub struct EncodingSession<'arena> {
    arena: &'arena Bump,
    stats: RefCell<EmitStats>,
    label_names: RefCell<HashMap<u32, &'arena str>>,
}

impl<'arena> EncodingSession<'arena> {
    pub fn new(arena: &'arena Bump) -> Self {
        Self {
            arena,
            stats: RefCell::new(EmitStats::default()),
            label_names: RefCell::new(HashMap::new()),
        }
    }

    pub fn arena(&self) -> &'arena Bump {
        self.arena
    }

    /// Attach a debug name to a label id, interned in the arena.
    pub fn name_label(&self, label_id: u32, name: &str) {
        let interned = self.arena.alloc_str(name);
        self.label_names.borrow_mut().insert(label_id, interned);
    }

    pub fn label_name(&self, label_id: u32) -> Option<&'arena str> {
        self.label_names.borrow().get(&label_id).copied()
    }

    pub fn record_words(&self, n: usize) {
        self.stats.borrow_mut().words_emitted += n;
    }

    pub fn record_aux_words(&self, n: usize) {
        let mut stats = self.stats.borrow_mut();
        stats.aux_words += n;
        stats.words_emitted += n;
    }

    pub fn record_family(&self, family: OpFamily) {
        self.stats.borrow_mut().family_hits[family.index()] += 1;
    }

    pub fn record_branch(&self) {
        self.stats.borrow_mut().branches += 1;
    }

    pub fn record_label_bound(&self) {
        self.stats.borrow_mut().labels_bound += 1;
    }

    /// Snapshot of the statistics so far.
    pub fn stats(&self) -> EmitStats {
        self.stats.borrow().clone()
    }

    pub fn reset_stats(&self) {
        *self.stats.borrow_mut() = EmitStats::default();
    }
}
