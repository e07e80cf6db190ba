// This module defines the dynamic-dispatch seam between the portable operand model and
// the architecture-family backends. TargetBackend is polymorphic over the capability set
// an encoding backend must provide: arithmetic-class, logic-class, memory-class, and
// branch-class encoding, the capability-emulated operation families, the masking
// convention bridges, and the save/restore region bracket. A backend is constructed once
// per compiled target configuration and is selected at that point, not per call. Emit
// methods are infallible by design: the configuration was validated at construction,
// operand contracts are caller preconditions, and the only deferred failures (unbound
// labels, branch range) surface at buffer finalize.

//! The `TargetBackend` trait: one implementation per architecture family.

use super::buffer::{CodeBuffer, Label};
use super::config::{RoundMode, TargetConfig};
use super::operand::{Disp, Gpr, MemOperand, Vr};

/// Arithmetic-class vector operations (arithmetic field layout).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
}

/// Logic-class vector operations (logic/shift field layout).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    And,
    Or,
    Xor,
}

/// Scalar compare-and-branch conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cond {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

/// One architecture-family encoding backend.
///
/// Callers state abstract operations against the portable namespace; the
/// backend resolves addressing, width composition, and capability strategy
/// downward and appends the final instruction words to the buffer.
pub trait TargetBackend {
    /// Capability bitfield of the active configuration (`FEAT_*` constants).
    ///
    /// The only sanctioned runtime check: callers must confirm these bits
    /// before executing capability-specific generated code.
    fn features(&self) -> u32;

    fn config(&self) -> &TargetConfig;

    // Arithmetic-class encoding. The scalar form drives loop counters and
    // address computation around the vector kernels.
    fn emit_arith(&self, buf: &mut CodeBuffer, op: ArithOp, dst: Vr, a: Vr, b: Vr);
    fn emit_scalar_arith(&self, buf: &mut CodeBuffer, op: ArithOp, dst: Gpr, a: Gpr, b: Gpr);

    // Logic-class encoding.
    fn emit_logic(&self, buf: &mut CodeBuffer, op: LogicOp, dst: Vr, a: Vr, b: Vr);

    // Memory-class encoding.
    fn emit_load(&self, buf: &mut CodeBuffer, dst: Vr, mem: MemOperand, disp: Disp);
    fn emit_store(&self, buf: &mut CodeBuffer, src: Vr, mem: MemOperand, disp: Disp);
    fn emit_scalar_load(&self, buf: &mut CodeBuffer, dst: Gpr, mem: MemOperand, disp: Disp);
    fn emit_scalar_store(&self, buf: &mut CodeBuffer, src: Gpr, mem: MemOperand, disp: Disp);

    // Branch-class encoding.
    fn emit_jump(&self, buf: &mut CodeBuffer, target: Label);
    fn emit_cmp_branch(&self, buf: &mut CodeBuffer, cond: Cond, a: Gpr, b: Gpr, target: Label);

    // Masking convention.
    fn emit_lanes_eq(&self, buf: &mut CodeBuffer, mask: Vr, a: Vr, b: Vr);
    fn emit_branch_all_true(&self, buf: &mut CodeBuffer, mask: Vr, target: Label);
    fn emit_branch_none_true(&self, buf: &mut CodeBuffer, mask: Vr, target: Label);

    // Capability-emulated operation families.
    fn emit_div(&self, buf: &mut CodeBuffer, dst: Vr, a: Vr, b: Vr);
    fn emit_sqrt(&self, buf: &mut CodeBuffer, dst: Vr, a: Vr);
    fn emit_recip(&self, buf: &mut CodeBuffer, dst: Vr, a: Vr);
    fn emit_rsqrt(&self, buf: &mut CodeBuffer, dst: Vr, a: Vr);
    fn emit_fma(&self, buf: &mut CodeBuffer, dst: Vr, a: Vr, b: Vr, c: Vr);
    fn emit_fms(&self, buf: &mut CodeBuffer, dst: Vr, a: Vr, b: Vr, c: Vr);
    fn emit_round(&self, buf: &mut CodeBuffer, dst: Vr, a: Vr, mode: RoundMode);

    // Region bracket: save the full portable file to the caller's info block
    // on entry and restore it on exit. Layouts of both halves must match.
    fn emit_enter(&self, buf: &mut CodeBuffer, info_base: Gpr);
    fn emit_leave(&self, buf: &mut CodeBuffer, info_base: Gpr);
}
