// This module is the capability emulation layer of the ppc backend. Each hardware-
// optional operation family (divide, square root, reciprocal, reciprocal square root,
// fused multiply-add/subtract, directed rounding) is emitted through one of three
// strategies fixed at configuration time: Native (one instruction per native-width
// repetition), Refine (a low-precision hardware estimate corrected by Newton steps built
// from the fused-multiply primitives), or ScalarFallback (lanes round-tripped through
// scratch memory and the scalar floating-point unit). The vector unit of this family has
// estimate instructions but no full-precision divide or square root, so those families
// reject the Native strategy at configuration. All strategies agree within the relative
// tolerance documented by the validation harness; accuracy may differ slightly between
// them, and callers needing IEEE-strict results must configure accordingly.
//
// Known limitation (not a bug): the fused multiply-subtract paths produce the subtract
// by negating a fused negative-multiply-subtract result, and that negation happens
// outside the rounding step. Round-to-nearest and round-to-zero are symmetric, so all
// strategies agree under them; the directed modes (toward +/- infinity) flip under
// negation and are therefore not guaranteed consistent for the Fms family.
//
// Register contract: destination registers must not alias source registers for the
// Refine and ScalarFallback strategies (both read sources after the first destination
// write). This is a caller precondition, not a runtime check.

//! Native / Refine / ScalarFallback emission per operation family.

use log::debug;

use crate::core::buffer::CodeBuffer;
use crate::core::config::{OpFamily, RoundMode, Strategy, VectorWidth};
use crate::core::operand::{Gpr, PhysReg, Vr};

use super::regs::{CONST_VR, MASK_ONES_VR, SCRATCH_FPR, SCRATCH_GPR, SCRATCH_VR_TMP, ZERO_SLOT};
use super::width;
use super::word::{self, op};

/// Bytes of caller-reserved scratch memory the fallback paths require:
/// three 16-byte transfer areas (two sources and one extra operand). The
/// block must be 16-byte aligned; the vector transfers ignore the low four
/// address bits.
pub const SCRATCH_MEM_SIZE: i32 = 48;

/// Extra compute temporary for three-operand scalar lanes. f0 is volatile
/// in every calling convention this family runs under, so the fused
/// fallback clobbers it without saving; the save layout's two scalar slots
/// cover only the f12/f13 lane-transfer pair.
const FPR_TMP: PhysReg = 0;

const AREA_A: i16 = 0;
const AREA_B: i16 = 16;
const AREA_C: i16 = 32;

/// Whether a family has a single-instruction native path on this family.
pub const fn native_available(family: OpFamily) -> bool {
    !matches!(family, OpFamily::Div | OpFamily::Sqrt)
}

/// Whether a family has an estimate primitive to refine.
pub const fn refine_available(family: OpFamily) -> bool {
    matches!(
        family,
        OpFamily::Div | OpFamily::Sqrt | OpFamily::Recip | OpFamily::Rsqrt
    )
}

// ---------------------------------------------------------------------------
// Constant materialization into the scratch constant register.

/// v31 <- 1.0f in every lane (splat 1, convert with scale 0).
fn const_one(buf: &mut CodeBuffer) {
    buf.push(word::vx_splat_form(CONST_VR, 1, op::VX_VSPLTISW));
    buf.push(word::vx_scale_form(CONST_VR, CONST_VR, 0, op::VX_VCFSX));
}

/// v30 <- 0.5f (splat 1, convert with scale 1). Borrows the mask reference
/// register; callers must re-materialize it afterwards.
fn borrow_half(buf: &mut CodeBuffer) {
    buf.push(word::vx_splat_form(MASK_ONES_VR, 1, op::VX_VSPLTISW));
    buf.push(word::vx_scale_form(MASK_ONES_VR, MASK_ONES_VR, 1, op::VX_VCFSX));
}

fn restore_mask_reference(buf: &mut CodeBuffer) {
    buf.push(word::vx_splat_form(MASK_ONES_VR, -1, op::VX_VSPLTISW));
}

fn vxor_zero(buf: &mut CodeBuffer, vr: PhysReg) {
    buf.push(word::vx_form(vr, vr, vr, op::VX_VXOR));
}

// ---------------------------------------------------------------------------
// Refine bodies (per native-width half).

/// Two Newton steps on a reciprocal estimate of `b`, leaving the refined
/// reciprocal in `out`. Expects 1.0 in v31; clobbers both vector temps.
fn refine_recip_half(buf: &mut CodeBuffer, out: PhysReg, b: PhysReg) {
    let t0 = SCRATCH_VR_TMP[0];
    let t1 = SCRATCH_VR_TMP[1];
    buf.push(word::vx_form(t0, 0, b, op::VX_VREFP));
    for step in 0..2 {
        let dst = if step == 1 { out } else { t0 };
        // t1 = 1 - t0*b; dst = t0 + t0*t1
        buf.push(word::va_form(t1, t0, CONST_VR, b, op::VA_VNMSUBFP));
        buf.push(word::va_form(dst, t0, t0, t1, op::VA_VMADDFP));
    }
}

// ---------------------------------------------------------------------------
// Scalar-fallback plumbing.

/// Store one vector half into a scratch area (indexed-only store; nonzero
/// area offsets materialize through scratch, matching the resolver tiers).
fn store_half_to_area(buf: &mut CodeBuffer, vr: PhysReg, area: i16, sb: PhysReg) {
    if area == 0 {
        buf.push(word::x_form(vr, ZERO_SLOT, sb, op::X_STVX));
    } else {
        buf.push(word::li(SCRATCH_GPR[0], area));
        buf.push(word::x_form(vr, sb, SCRATCH_GPR[0], op::X_STVX));
    }
}

fn load_half_from_area(buf: &mut CodeBuffer, vr: PhysReg, area: i16, sb: PhysReg) {
    if area == 0 {
        buf.push(word::x_form(vr, ZERO_SLOT, sb, op::X_LVX));
    } else {
        buf.push(word::li(SCRATCH_GPR[0], area));
        buf.push(word::x_form(vr, sb, SCRATCH_GPR[0], op::X_LVX));
    }
}

// ---------------------------------------------------------------------------
// Divide.

pub fn emit_div(
    buf: &mut CodeBuffer,
    width: VectorWidth,
    strategy: Strategy,
    dst: Vr,
    a: Vr,
    b: Vr,
    scratch_base: Gpr,
) {
    debug!("div {:?} {:?}", width, strategy);
    match strategy {
        Strategy::Native => unreachable!("no native vector divide; rejected at configuration"),
        Strategy::Refine => {
            let t0 = SCRATCH_VR_TMP[0];
            let t1 = SCRATCH_VR_TMP[1];
            const_one(buf);
            width::for_each_half(width, |h| {
                let (d, ah, bh) = (
                    width::phys_half(dst, h),
                    width::phys_half(a, h),
                    width::phys_half(b, h),
                );
                refine_recip_half(buf, t0, bh);
                // d = a*recip, then one residual correction:
                // r = a - d*b; d = d + r*recip
                vxor_zero(buf, t1);
                buf.push(word::va_form(d, ah, t1, t0, op::VA_VMADDFP));
                buf.push(word::va_form(t1, d, ah, bh, op::VA_VNMSUBFP));
                buf.push(word::va_form(d, t1, d, t0, op::VA_VMADDFP));
            });
        }
        Strategy::ScalarFallback => {
            let sb = scratch_base.phys();
            width::for_each_half(width, |h| {
                store_half_to_area(buf, width::phys_half(a, h), AREA_A, sb);
                store_half_to_area(buf, width::phys_half(b, h), AREA_B, sb);
                for lane in 0..4i16 {
                    buf.push(word::d_form(op::LFS, SCRATCH_FPR[0], sb, AREA_A + lane * 4));
                    buf.push(word::d_form(op::LFS, SCRATCH_FPR[1], sb, AREA_B + lane * 4));
                    buf.push(word::a_form(
                        op::MAJOR_FPS,
                        SCRATCH_FPR[0],
                        SCRATCH_FPR[0],
                        SCRATCH_FPR[1],
                        0,
                        op::A_FDIVS,
                    ));
                    buf.push(word::d_form(op::STFS, SCRATCH_FPR[0], sb, AREA_A + lane * 4));
                }
                load_half_from_area(buf, width::phys_half(dst, h), AREA_A, sb);
            });
        }
    }
}

// ---------------------------------------------------------------------------
// Square root.

pub fn emit_sqrt(
    buf: &mut CodeBuffer,
    width: VectorWidth,
    strategy: Strategy,
    dst: Vr,
    a: Vr,
    scratch_base: Gpr,
) {
    debug!("sqrt {:?} {:?}", width, strategy);
    match strategy {
        Strategy::Native => unreachable!("no native vector sqrt; rejected at configuration"),
        Strategy::Refine => {
            // sqrt(x) = x * rsqrt(x), with the rsqrt estimate Newton-refined.
            // Zero inputs are a documented accuracy exception of this
            // strategy (estimate path yields NaN, fallback yields 0).
            let t0 = SCRATCH_VR_TMP[0];
            let t1 = SCRATCH_VR_TMP[1];
            const_one(buf);
            borrow_half(buf);
            width::for_each_half(width, |h| {
                let (d, x) = (width::phys_half(dst, h), width::phys_half(a, h));
                buf.push(word::vx_form(t0, 0, x, op::VX_VRSQRTEFP));
                // t1 = est^2; t1 = 1 - x*t1; t1 = 0.5*t1 + 1
                vxor_zero(buf, t1);
                buf.push(word::va_form(t1, t0, t1, t0, op::VA_VMADDFP));
                buf.push(word::va_form(t1, x, CONST_VR, t1, op::VA_VNMSUBFP));
                buf.push(word::va_form(t1, t1, CONST_VR, MASK_ONES_VR, op::VA_VMADDFP));
                // d = est * t1 (refined rsqrt), then d = x * d
                vxor_zero(buf, d);
                buf.push(word::va_form(d, t0, d, t1, op::VA_VMADDFP));
                vxor_zero(buf, t0);
                buf.push(word::va_form(d, x, t0, d, op::VA_VMADDFP));
            });
            restore_mask_reference(buf);
        }
        Strategy::ScalarFallback => {
            let sb = scratch_base.phys();
            width::for_each_half(width, |h| {
                store_half_to_area(buf, width::phys_half(a, h), AREA_A, sb);
                for lane in 0..4i16 {
                    buf.push(word::d_form(op::LFS, SCRATCH_FPR[0], sb, AREA_A + lane * 4));
                    buf.push(word::a_form(
                        op::MAJOR_FPS,
                        SCRATCH_FPR[0],
                        0,
                        SCRATCH_FPR[0],
                        0,
                        op::A_FSQRTS,
                    ));
                    buf.push(word::d_form(op::STFS, SCRATCH_FPR[0], sb, AREA_A + lane * 4));
                }
                load_half_from_area(buf, width::phys_half(dst, h), AREA_A, sb);
            });
        }
    }
}

// ---------------------------------------------------------------------------
// Reciprocal.

pub fn emit_recip(
    buf: &mut CodeBuffer,
    width: VectorWidth,
    strategy: Strategy,
    dst: Vr,
    a: Vr,
    scratch_base: Gpr,
) {
    debug!("recip {:?} {:?}", width, strategy);
    match strategy {
        Strategy::Native => {
            // The raw estimate is the native primitive of this family.
            width::for_each_half(width, |h| {
                buf.push(word::vx_form(
                    width::phys_half(dst, h),
                    0,
                    width::phys_half(a, h),
                    op::VX_VREFP,
                ));
            });
        }
        Strategy::Refine => {
            const_one(buf);
            width::for_each_half(width, |h| {
                refine_recip_half(buf, width::phys_half(dst, h), width::phys_half(a, h));
            });
        }
        Strategy::ScalarFallback => {
            let sb = scratch_base.phys();
            // 1.0 staged through the constant register into the extra area,
            // then kept in the second transfer register across lanes.
            const_one(buf);
            store_half_to_area(buf, CONST_VR, AREA_C, sb);
            buf.push(word::d_form(op::LFS, SCRATCH_FPR[1], sb, AREA_C));
            width::for_each_half(width, |h| {
                store_half_to_area(buf, width::phys_half(a, h), AREA_A, sb);
                for lane in 0..4i16 {
                    buf.push(word::d_form(op::LFS, SCRATCH_FPR[0], sb, AREA_A + lane * 4));
                    buf.push(word::a_form(
                        op::MAJOR_FPS,
                        SCRATCH_FPR[0],
                        SCRATCH_FPR[1],
                        SCRATCH_FPR[0],
                        0,
                        op::A_FDIVS,
                    ));
                    buf.push(word::d_form(op::STFS, SCRATCH_FPR[0], sb, AREA_A + lane * 4));
                }
                load_half_from_area(buf, width::phys_half(dst, h), AREA_A, sb);
            });
        }
    }
}

// ---------------------------------------------------------------------------
// Reciprocal square root.

pub fn emit_rsqrt(
    buf: &mut CodeBuffer,
    width: VectorWidth,
    strategy: Strategy,
    dst: Vr,
    a: Vr,
    scratch_base: Gpr,
) {
    debug!("rsqrt {:?} {:?}", width, strategy);
    match strategy {
        Strategy::Native => {
            width::for_each_half(width, |h| {
                buf.push(word::vx_form(
                    width::phys_half(dst, h),
                    0,
                    width::phys_half(a, h),
                    op::VX_VRSQRTEFP,
                ));
            });
        }
        Strategy::Refine => {
            let t0 = SCRATCH_VR_TMP[0];
            let t1 = SCRATCH_VR_TMP[1];
            const_one(buf);
            borrow_half(buf);
            width::for_each_half(width, |h| {
                let (d, x) = (width::phys_half(dst, h), width::phys_half(a, h));
                buf.push(word::vx_form(t0, 0, x, op::VX_VRSQRTEFP));
                // y1 = y0 * (1 + 0.5*(1 - x*y0^2))
                vxor_zero(buf, t1);
                buf.push(word::va_form(t1, t0, t1, t0, op::VA_VMADDFP));
                buf.push(word::va_form(t1, x, CONST_VR, t1, op::VA_VNMSUBFP));
                buf.push(word::va_form(t1, t1, CONST_VR, MASK_ONES_VR, op::VA_VMADDFP));
                vxor_zero(buf, d);
                buf.push(word::va_form(d, t0, d, t1, op::VA_VMADDFP));
            });
            restore_mask_reference(buf);
        }
        Strategy::ScalarFallback => {
            let sb = scratch_base.phys();
            const_one(buf);
            store_half_to_area(buf, CONST_VR, AREA_C, sb);
            buf.push(word::d_form(op::LFS, SCRATCH_FPR[1], sb, AREA_C));
            width::for_each_half(width, |h| {
                store_half_to_area(buf, width::phys_half(a, h), AREA_A, sb);
                for lane in 0..4i16 {
                    buf.push(word::d_form(op::LFS, SCRATCH_FPR[0], sb, AREA_A + lane * 4));
                    buf.push(word::a_form(
                        op::MAJOR_FPS,
                        SCRATCH_FPR[0],
                        0,
                        SCRATCH_FPR[0],
                        0,
                        op::A_FSQRTS,
                    ));
                    buf.push(word::a_form(
                        op::MAJOR_FPS,
                        SCRATCH_FPR[0],
                        SCRATCH_FPR[1],
                        SCRATCH_FPR[0],
                        0,
                        op::A_FDIVS,
                    ));
                    buf.push(word::d_form(op::STFS, SCRATCH_FPR[0], sb, AREA_A + lane * 4));
                }
                load_half_from_area(buf, width::phys_half(dst, h), AREA_A, sb);
            });
        }
    }
}

// ---------------------------------------------------------------------------
// Fused multiply-add / multiply-subtract.

pub fn emit_fma(
    buf: &mut CodeBuffer,
    width: VectorWidth,
    strategy: Strategy,
    dst: Vr,
    a: Vr,
    b: Vr,
    c: Vr,
    scratch_base: Gpr,
) {
    debug!("fma {:?} {:?}", width, strategy);
    match strategy {
        Strategy::Native => {
            width::for_each_half(width, |h| {
                buf.push(word::va_form(
                    width::phys_half(dst, h),
                    width::phys_half(a, h),
                    width::phys_half(c, h),
                    width::phys_half(b, h),
                    op::VA_VMADDFP,
                ));
            });
        }
        Strategy::Refine => unreachable!("fused multiply is the refinement primitive itself"),
        Strategy::ScalarFallback => {
            emit_fused_fallback(buf, width, dst, a, b, c, scratch_base, false);
        }
    }
}

pub fn emit_fms(
    buf: &mut CodeBuffer,
    width: VectorWidth,
    strategy: Strategy,
    dst: Vr,
    a: Vr,
    b: Vr,
    c: Vr,
    scratch_base: Gpr,
) {
    debug!("fms {:?} {:?}", width, strategy);
    match strategy {
        Strategy::Native => {
            // dst = -(c - a*b): the negation is exact, but directed rounding
            // modes flip under it (module-level caveat).
            let t = SCRATCH_VR_TMP[0];
            let z = SCRATCH_VR_TMP[1];
            width::for_each_half(width, |h| {
                buf.push(word::va_form(
                    t,
                    width::phys_half(a, h),
                    width::phys_half(c, h),
                    width::phys_half(b, h),
                    op::VA_VNMSUBFP,
                ));
                vxor_zero(buf, z);
                buf.push(word::vx_form(
                    width::phys_half(dst, h),
                    z,
                    t,
                    op::VX_VSUBFP,
                ));
            });
        }
        Strategy::Refine => unreachable!("fused multiply is the refinement primitive itself"),
        Strategy::ScalarFallback => {
            emit_fused_fallback(buf, width, dst, a, b, c, scratch_base, true);
        }
    }
}

/// Shared three-operand scalar fallback; `negate` selects the
/// multiply-subtract variant (negation applied after rounding).
#[allow(clippy::too_many_arguments)]
fn emit_fused_fallback(
    buf: &mut CodeBuffer,
    width: VectorWidth,
    dst: Vr,
    a: Vr,
    b: Vr,
    c: Vr,
    scratch_base: Gpr,
    negate: bool,
) {
    let sb = scratch_base.phys();
    width::for_each_half(width, |h| {
        store_half_to_area(buf, width::phys_half(a, h), AREA_A, sb);
        store_half_to_area(buf, width::phys_half(b, h), AREA_B, sb);
        store_half_to_area(buf, width::phys_half(c, h), AREA_C, sb);
        for lane in 0..4i16 {
            buf.push(word::d_form(op::LFS, SCRATCH_FPR[0], sb, AREA_A + lane * 4));
            buf.push(word::d_form(op::LFS, SCRATCH_FPR[1], sb, AREA_B + lane * 4));
            buf.push(word::d_form(op::LFS, FPR_TMP, sb, AREA_C + lane * 4));
            if negate {
                // fnmsubs rounds c - a*b once; fneg flips the sign outside
                // the rounding step.
                buf.push(word::a_form(
                    op::MAJOR_FPS,
                    SCRATCH_FPR[0],
                    SCRATCH_FPR[0],
                    FPR_TMP,
                    SCRATCH_FPR[1],
                    op::A_FNMSUBS,
                ));
                buf.push(word::fp_x_form(SCRATCH_FPR[0], SCRATCH_FPR[0], op::X_FNEG));
            } else {
                buf.push(word::a_form(
                    op::MAJOR_FPS,
                    SCRATCH_FPR[0],
                    SCRATCH_FPR[0],
                    FPR_TMP,
                    SCRATCH_FPR[1],
                    op::A_FMADDS,
                ));
            }
            buf.push(word::d_form(op::STFS, SCRATCH_FPR[0], sb, AREA_A + lane * 4));
        }
        load_half_from_area(buf, width::phys_half(dst, h), AREA_A, sb);
    });
}

// ---------------------------------------------------------------------------
// Directed rounding.

pub fn emit_round(
    buf: &mut CodeBuffer,
    width: VectorWidth,
    strategy: Strategy,
    dst: Vr,
    a: Vr,
    mode: RoundMode,
    scratch_base: Gpr,
) {
    debug!("round {:?} {:?} {:?}", width, strategy, mode);
    let vector_xo = match mode {
        RoundMode::Nearest => op::VX_VRFIN,
        RoundMode::TowardZero => op::VX_VRFIZ,
        RoundMode::TowardPosInf => op::VX_VRFIP,
        RoundMode::TowardNegInf => op::VX_VRFIM,
    };
    match strategy {
        Strategy::Native => {
            width::for_each_half(width, |h| {
                buf.push(word::vx_form(
                    width::phys_half(dst, h),
                    0,
                    width::phys_half(a, h),
                    vector_xo,
                ));
            });
        }
        Strategy::Refine => unreachable!("rounding has no estimate to refine"),
        Strategy::ScalarFallback => {
            let scalar_xo = match mode {
                RoundMode::Nearest => op::X_FRIN,
                RoundMode::TowardZero => op::X_FRIZ,
                RoundMode::TowardPosInf => op::X_FRIP,
                RoundMode::TowardNegInf => op::X_FRIM,
            };
            let sb = scratch_base.phys();
            width::for_each_half(width, |h| {
                store_half_to_area(buf, width::phys_half(a, h), AREA_A, sb);
                for lane in 0..4i16 {
                    buf.push(word::d_form(op::LFS, SCRATCH_FPR[0], sb, AREA_A + lane * 4));
                    buf.push(word::fp_x_form(SCRATCH_FPR[0], SCRATCH_FPR[0], scalar_xo));
                    buf.push(word::d_form(op::STFS, SCRATCH_FPR[0], sb, AREA_A + lane * 4));
                }
                load_half_from_area(buf, width::phys_half(dst, h), AREA_A, sb);
            });
        }
    }
}
