// This module is the control-flow and masking layer of the ppc backend. Branches
// reference buffer labels and are resolved to concrete relative displacements by the
// buffer at finalize; this layer only composes the branch words and the compare that
// feeds them. The masking convention represents a true lane as all-bits-set and a false
// lane as all-bits-clear. Lane masks are produced by the floating-point compare; once
// produced they are plain bit patterns, so "all lanes true" reduces the mask halves with
// a bitwise AND and "no lanes true" with a bitwise OR, then a dot-form integer compare
// against the all-ones reference register folds the reduction into the condition
// register's sixth field, where one conditional branch picks the all-true or the
// all-false bit. Terminal
// states are branch-taken and branch-not-taken; there is no third mask state.

//! Labels, compare-and-branch, and mask reduction.

use crate::core::backend::Cond;
use crate::core::buffer::{BranchForm, CodeBuffer, Label};
use crate::core::config::VectorWidth;
use crate::core::operand::{Gpr, Vr};

use super::regs::{MASK_ONES_VR, SCRATCH_VR_TMP};
use super::width;
use super::word::{self, op};

// Condition-register bit indices within one field.
const CR_LT: u8 = 0;
const CR_GT: u8 = 1;
const CR_EQ: u8 = 2;

// BO encodings: branch if the CR bit is set / clear.
const BO_TRUE: u8 = 12;
const BO_FALSE: u8 = 4;

// The vector compare record bit targets the sixth CR field.
const CR6_BASE: u8 = 24;
const CR6_ALL_TRUE: u8 = CR6_BASE + CR_LT;
const CR6_ALL_FALSE: u8 = CR6_BASE + CR_EQ;

/// Unconditional branch to a label.
pub fn emit_jump(buf: &mut CodeBuffer, target: Label) {
    buf.push_branch(word::i_form(), target, BranchForm::Rel26);
}

/// Scalar compare of two portable GP registers followed by a conditional
/// branch on the requested condition.
pub fn emit_cmp_branch(buf: &mut CodeBuffer, cond: Cond, a: Gpr, b: Gpr, target: Label) {
    buf.push(word::cmp_form(0, a.phys(), b.phys()));
    let (bo, bi) = match cond {
        Cond::Eq => (BO_TRUE, CR_EQ),
        Cond::Ne => (BO_FALSE, CR_EQ),
        Cond::Lt => (BO_TRUE, CR_LT),
        Cond::Ge => (BO_FALSE, CR_LT),
        Cond::Gt => (BO_TRUE, CR_GT),
        Cond::Le => (BO_FALSE, CR_GT),
    };
    buf.push_branch(word::b_form(bo, bi), target, BranchForm::Rel16);
}

/// Per-lane floating-point equality mask over the full logical width.
/// Zeroes of either sign compare equal; a NaN lane is false.
pub fn emit_lanes_eq(buf: &mut CodeBuffer, width: VectorWidth, mask: Vr, a: Vr, b: Vr) {
    width::for_each_half(width, |h| {
        buf.push(word::vxr_form(
            width::phys_half(mask, h),
            width::phys_half(a, h),
            width::phys_half(b, h),
            false,
            op::VXR_VCMPEQFP,
        ));
    });
}

/// Reduce the mask halves with the given logic opcode into scratch, ending
/// with the physical register that holds the reduction.
fn reduce_mask(buf: &mut CodeBuffer, width: VectorWidth, mask: Vr, logic_xo: u32) -> u8 {
    let mut reduced = width::phys_half(mask, 0);
    width::for_each_half(width, |h| {
        if h == 0 {
            return;
        }
        buf.push(word::vx_form(
            SCRATCH_VR_TMP[0],
            reduced,
            width::phys_half(mask, h),
            logic_xo,
        ));
        reduced = SCRATCH_VR_TMP[0];
    });
    reduced
}

/// Branch to `target` iff every lane of the mask is true.
pub fn emit_branch_all_true(buf: &mut CodeBuffer, width: VectorWidth, mask: Vr, target: Label) {
    let reduced = reduce_mask(buf, width, mask, op::VX_VAND);
    buf.push(word::vxr_form(
        SCRATCH_VR_TMP[1],
        reduced,
        MASK_ONES_VR,
        true,
        op::VXR_VCMPEQUW,
    ));
    buf.push_branch(word::b_form(BO_TRUE, CR6_ALL_TRUE), target, BranchForm::Rel16);
}

/// Branch to `target` iff no lane of the mask is true.
pub fn emit_branch_none_true(buf: &mut CodeBuffer, width: VectorWidth, mask: Vr, target: Label) {
    let reduced = reduce_mask(buf, width, mask, op::VX_VOR);
    buf.push(word::vxr_form(
        SCRATCH_VR_TMP[1],
        reduced,
        MASK_ONES_VR,
        true,
        op::VXR_VCMPEQUW,
    ));
    buf.push_branch(word::b_form(BO_TRUE, CR6_ALL_FALSE), target, BranchForm::Rel16);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cmp_branch_emits_compare_then_branch() {
        let mut buf = CodeBuffer::new();
        let out = buf.create_label();
        emit_cmp_branch(&mut buf, Cond::Lt, Gpr::G0, Gpr::G1, out);
        buf.bind_label(out);
        let words = buf.finalize().unwrap();
        assert_eq!(words.len(), 2);
        assert_eq!(word::decode_opcd(words[0]), op::MAJOR_X);
        assert_eq!(word::decode_opcd(words[1]), op::BC);
        assert_eq!(word::decode_rt(words[1]), BO_TRUE);
        assert_eq!(word::decode_ra(words[1]), CR_LT);
    }

    #[test]
    fn lanes_eq_expands_per_half() {
        let mut buf = CodeBuffer::new();
        emit_lanes_eq(&mut buf, VectorWidth::W256, Vr::V2, Vr::V0, Vr::V1);
        let words = buf.finalize().unwrap();
        assert_eq!(words.len(), 2);
        for (h, w) in words.iter().enumerate() {
            // Lane data compares as floats; only the mask reduction below
            // compares bit patterns.
            assert_eq!(word::decode_vxr_xo(*w), op::VXR_VCMPEQFP);
            assert!(!word::decode_vxr_record(*w));
            assert_eq!(word::decode_rt(*w), Vr::V2.phys_base() + h as u8);
        }
    }

    #[test]
    fn all_true_native_width_skips_reduction() {
        let mut buf = CodeBuffer::new();
        let t = buf.create_label();
        emit_branch_all_true(&mut buf, VectorWidth::W128, Vr::V0, t);
        buf.bind_label(t);
        let words = buf.finalize().unwrap();
        // Dot-form compare straight on the mask half, then the branch.
        assert_eq!(words.len(), 2);
        assert!(word::decode_vxr_record(words[0]));
        assert_eq!(word::decode_ra(words[0]), Vr::V0.phys_base());
        assert_eq!(word::decode_rb(words[0]), MASK_ONES_VR);
        assert_eq!(word::decode_ra(words[1]), CR6_ALL_TRUE);
    }

    #[test]
    fn none_true_uses_or_reduction() {
        let mut buf = CodeBuffer::new();
        let t = buf.create_label();
        emit_branch_none_true(&mut buf, VectorWidth::W512, Vr::V1, t);
        buf.bind_label(t);
        let words = buf.finalize().unwrap();
        // Three OR reductions, one dot compare, one branch.
        assert_eq!(words.len(), 5);
        for w in &words[0..3] {
            assert_eq!(word::decode_vx_xo(*w), op::VX_VOR);
        }
        assert!(word::decode_vxr_record(words[3]));
        assert_eq!(word::decode_ra(words[4]), CR6_ALL_FALSE);
    }

    #[test]
    fn all_true_wide_uses_and_reduction() {
        let mut buf = CodeBuffer::new();
        let t = buf.create_label();
        emit_branch_all_true(&mut buf, VectorWidth::W256, Vr::V0, t);
        buf.bind_label(t);
        let words = buf.finalize().unwrap();
        assert_eq!(words.len(), 3);
        assert_eq!(word::decode_vx_xo(words[0]), op::VX_VAND);
    }
}
