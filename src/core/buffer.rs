// This module provides the owned code buffer that replaces the original build-time token
// substitution mechanism with an explicit code-generation API: backends append encoded
// 32-bit instruction words in program order, and the buffer is finalized once into the
// word sequence handed to the external assembly/embedding mechanism. Labels are created
// before or after the position they name; branch words referencing an unbound label are
// recorded as fixups (word index, label, relative form) and patched during finalize, the
// same patch-after-layout scheme compiler backends use for forward branches. Finalize is
// the only point where branch range violations and unbound labels can surface; everything
// before it is infallible appending.

//! Owned instruction-word buffer with label fixups.

use hashbrown::HashMap;
use log::trace;

use super::error::{EncodeError, EncodeResult};

/// Symbolic position in the emitted word stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label(pub(crate) u32);

/// Relative branch encoding form of a fixup site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchForm {
    /// 26-bit byte displacement (unconditional branch, I-form).
    Rel26,
    /// 16-bit byte displacement (conditional branch, B-form).
    Rel16,
}

impl BranchForm {
    const fn mask(self) -> u32 {
        match self {
            BranchForm::Rel26 => 0x03FF_FFFC,
            BranchForm::Rel16 => 0x0000_FFFC,
        }
    }

    const fn name(self) -> &'static str {
        match self {
            BranchForm::Rel26 => "rel26",
            BranchForm::Rel16 => "rel16",
        }
    }

    const fn in_range(self, disp_bytes: i64) -> bool {
        match self {
            BranchForm::Rel26 => disp_bytes >= -(1 << 25) && disp_bytes < (1 << 25),
            BranchForm::Rel16 => disp_bytes >= -(1 << 15) && disp_bytes < (1 << 15),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Fixup {
    word_idx: usize,
    label: Label,
    form: BranchForm,
}

/// Growable buffer of encoded instruction words.
pub struct CodeBuffer {
    words: Vec<u32>,
    /// Bound position (word index) per label id.
    bound: HashMap<u32, usize>,
    next_label: u32,
    fixups: Vec<Fixup>,
}

impl CodeBuffer {
    pub fn new() -> Self {
        Self {
            words: Vec::new(),
            bound: HashMap::new(),
            next_label: 0,
            fixups: Vec::new(),
        }
    }

    /// Append one instruction word, returning its word index.
    pub fn push(&mut self, word: u32) -> usize {
        let idx = self.words.len();
        self.words.push(word);
        idx
    }

    /// Append a slice of words in order.
    pub fn push_all(&mut self, words: &[u32]) {
        self.words.extend_from_slice(words);
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Words emitted so far (displacement fields of pending branches still zero).
    pub fn words(&self) -> &[u32] {
        &self.words
    }

    /// Create a fresh, unbound label.
    pub fn create_label(&mut self) -> Label {
        let label = Label(self.next_label);
        self.next_label += 1;
        label
    }

    /// Bind a label to the current position.
    pub fn bind_label(&mut self, label: Label) {
        trace!("bind label {:?} at word {}", label, self.words.len());
        self.bound.insert(label.0, self.words.len());
    }

    /// Whether a label has been bound to a position.
    pub fn is_bound(&self, label: Label) -> bool {
        self.bound.contains_key(&label.0)
    }

    /// Append a branch word whose displacement field is patched at finalize.
    pub fn push_branch(&mut self, word: u32, label: Label, form: BranchForm) -> usize {
        let idx = self.push(word);
        self.fixups.push(Fixup {
            word_idx: idx,
            label,
            form,
        });
        idx
    }

    /// Resolve all branch fixups and return the finished word sequence.
    pub fn finalize(mut self) -> EncodeResult<Vec<u32>> {
        for fixup in &self.fixups {
            let target = *self
                .bound
                .get(&fixup.label.0)
                .ok_or(EncodeError::UnboundLabel(fixup.label))?;
            let disp_bytes = (target as i64 - fixup.word_idx as i64) * 4;
            if !fixup.form.in_range(disp_bytes) {
                return Err(EncodeError::BranchOutOfRange {
                    form: fixup.form.name(),
                    disp: disp_bytes,
                });
            }
            self.words[fixup.word_idx] |= (disp_bytes as u32) & fixup.form.mask();
        }
        trace!(
            "finalized {} words, {} branch fixups",
            self.words.len(),
            self.fixups.len()
        );
        Ok(self.words)
    }

    /// Big-endian byte view for the external embedding mechanism.
    pub fn to_be_bytes(words: &[u32]) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(words.len() * 4);
        for w in words {
            bytes.extend_from_slice(&w.to_be_bytes());
        }
        bytes
    }
}

impl Default for CodeBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_finalize_without_branches() {
        let mut buf = CodeBuffer::new();
        buf.push(0x6000_0000); // ori r0,r0,0
        buf.push_all(&[0x7C00_0050, 0x7C00_0194]);
        assert_eq!(buf.len(), 3);
        let words = buf.finalize().unwrap();
        assert_eq!(words.len(), 3);
    }

    #[test]
    fn backward_branch_patch() {
        let mut buf = CodeBuffer::new();
        let top = buf.create_label();
        buf.bind_label(top);
        buf.push(0);
        buf.push(0);
        // branch word at index 2, target index 0: -8 bytes
        buf.push_branch(0x4800_0000, top, BranchForm::Rel26);
        let words = buf.finalize().unwrap();
        assert_eq!(words[2] & 0x03FF_FFFC, (-8i32 as u32) & 0x03FF_FFFC);
    }

    #[test]
    fn forward_branch_patch() {
        let mut buf = CodeBuffer::new();
        let out = buf.create_label();
        buf.push_branch(0x4182_0000, out, BranchForm::Rel16); // beq
        buf.push(0);
        buf.push(0);
        buf.bind_label(out);
        let words = buf.finalize().unwrap();
        assert_eq!(words[0] & 0xFFFC, 12);
    }

    #[test]
    fn unbound_label_is_finalize_error() {
        let mut buf = CodeBuffer::new();
        let missing = buf.create_label();
        buf.push_branch(0x4800_0000, missing, BranchForm::Rel26);
        assert!(matches!(
            buf.finalize(),
            Err(EncodeError::UnboundLabel(_))
        ));
    }

    #[test]
    fn conditional_branch_range_check() {
        let mut buf = CodeBuffer::new();
        let far = buf.create_label();
        buf.push_branch(0x4182_0000, far, BranchForm::Rel16);
        for _ in 0..(1 << 13) {
            buf.push(0x6000_0000);
        }
        buf.bind_label(far);
        assert!(matches!(
            buf.finalize(),
            Err(EncodeError::BranchOutOfRange { form: "rel16", .. })
        ));
    }

    #[test]
    fn big_endian_byte_view() {
        let bytes = CodeBuffer::to_be_bytes(&[0x1234_5678]);
        assert_eq!(bytes, vec![0x12, 0x34, 0x56, 0x78]);
    }
}
