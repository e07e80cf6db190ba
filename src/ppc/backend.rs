// This module assembles the POWER-style backend from the layer modules: word builders,
// displacement resolver, width composition, control flow, capability emulation, and the
// save/restore layout. PpcBackend is constructed once per target configuration; the
// constructor is the single validation point, rejecting strategy/family pairs this
// hardware family has no emission path for (it ships estimate instructions but no
// full-precision vector divide or square root, and refinement only exists for the
// families with an estimate to refine). After construction every emit method is
// infallible: it resolves operands downward and appends words, deferring only label and
// range failures to buffer finalize. An optional session reference collects emission
// statistics; the backend works identically without one.

//! The POWER-style family backend: configuration validation and emission.

use log::{debug, trace};

use crate::core::backend::{ArithOp, Cond, LogicOp, TargetBackend};
use crate::core::buffer::{CodeBuffer, Label};
use crate::core::config::{
    OpFamily, RoundMode, Strategy, TargetConfig, FEAT_NATIVE_FMA, FEAT_NATIVE_RECIP,
    FEAT_NATIVE_ROUND, FEAT_NATIVE_RSQRT, FEAT_SCALAR_SLOTS,
};
use crate::core::error::{EncodeError, EncodeResult};
use crate::core::operand::{AddressMode, Disp, Gpr, MemOperand, Vr};
use crate::core::session::EncodingSession;

use super::control;
use super::emulation;
use super::regs::{self, SaveLayout, SCRATCH_GPR, SCRATCH_VR_TMP};
use super::resolver::{self, AddrFields, MemClass};
use super::width;
use super::word::{self, op};

/// Encoding backend for the POWER-style vector family.
#[derive(Debug)]
pub struct PpcBackend<'s, 'arena> {
    config: TargetConfig,
    layout: SaveLayout,
    features: u32,
    session: Option<&'s EncodingSession<'arena>>,
}

impl<'s, 'arena> PpcBackend<'s, 'arena> {
    /// Validate the configuration and build a backend for it.
    ///
    /// Every strategy/family pair is checked here; emission never re-checks.
    pub fn new(config: TargetConfig) -> EncodeResult<Self> {
        for family in OpFamily::ALL {
            let strategy = config.strategy(family);
            let supported = match strategy {
                Strategy::Native => emulation::native_available(family),
                Strategy::Refine => emulation::refine_available(family),
                Strategy::ScalarFallback => true,
            };
            if !supported {
                return Err(EncodeError::UnsupportedStrategy { family, strategy });
            }
        }

        let mut features = config.width_feature();
        if config.strategy(OpFamily::Recip) == Strategy::Native {
            features |= FEAT_NATIVE_RECIP;
        }
        if config.strategy(OpFamily::Rsqrt) == Strategy::Native {
            features |= FEAT_NATIVE_RSQRT;
        }
        if config.strategy(OpFamily::Fma) == Strategy::Native {
            features |= FEAT_NATIVE_FMA;
        }
        if config.strategy(OpFamily::Round) == Strategy::Native {
            features |= FEAT_NATIVE_ROUND;
        }
        if config.any_scalar_fallback() {
            features |= FEAT_SCALAR_SLOTS;
        }

        let layout = SaveLayout::for_config(&config);
        debug!(
            "backend: width={:?} features={:#010b} save_bytes={}",
            config.width,
            features,
            layout.total_size()
        );
        Ok(Self {
            config,
            layout,
            features,
            session: None,
        })
    }

    /// Attach a session for emission statistics.
    pub fn with_session(mut self, session: &'s EncodingSession<'arena>) -> Self {
        self.session = Some(session);
        self
    }

    fn note_words(&self, n: usize) {
        if let Some(s) = self.session {
            s.record_words(n);
        }
    }

    fn note_resolved(&self, total: usize, aux: usize) {
        if let Some(s) = self.session {
            s.record_words(total - aux);
            s.record_aux_words(aux);
        }
    }

    fn note_family(&self, family: OpFamily, delta: usize) {
        if let Some(s) = self.session {
            s.record_family(family);
            s.record_words(delta);
        }
    }

    fn note_branch(&self, delta: usize) {
        if let Some(s) = self.session {
            s.record_branch();
            s.record_words(delta);
        }
    }

    /// Width-composed vector load or store. Offset operands step the
    /// displacement per half and re-resolve; indexed operands step the index
    /// register through scratch for the upper halves.
    fn emit_vector_mem(&self, buf: &mut CodeBuffer, vr: Vr, mem: MemOperand, disp: Disp, xo: u32) {
        let before = buf.len();
        let mut aux_total = 0;
        width::for_each_half(self.config.width, |h| {
            let reg = width::phys_half(vr, h);
            if h > 0 {
                if let AddressMode::Indexed(index) = mem.mode {
                    buf.push(word::d_form(
                        op::ADDI,
                        SCRATCH_GPR[1],
                        index.phys(),
                        (h as i16) * 16,
                    ));
                    buf.push(word::x_form(reg, mem.base.phys(), SCRATCH_GPR[1], xo));
                    aux_total += 1;
                    return;
                }
            }
            let half_disp = Disp(disp.0 + (h as i32) * 16);
            let (fields, aux) = resolver::resolve(buf, mem, half_disp, MemClass::IndexedOnly);
            aux_total += aux;
            match fields {
                AddrFields::Indexed { ra, rb } => buf.push(word::x_form(reg, ra, rb, xo)),
                AddrFields::Disp { .. } => {
                    unreachable!("indexed-only class resolved to a displacement form")
                }
            };
        });
        self.note_resolved(buf.len() - before, aux_total);
    }
}

impl TargetBackend for PpcBackend<'_, '_> {
    fn features(&self) -> u32 {
        self.features
    }

    fn config(&self) -> &TargetConfig {
        &self.config
    }

    fn emit_arith(&self, buf: &mut CodeBuffer, arith: ArithOp, dst: Vr, a: Vr, b: Vr) {
        trace!("arith {:?} {:?} <- {:?}, {:?}", arith, dst, a, b);
        let before = buf.len();
        width::for_each_half(self.config.width, |h| {
            let (d, ah, bh) = (
                width::phys_half(dst, h),
                width::phys_half(a, h),
                width::phys_half(b, h),
            );
            match arith {
                ArithOp::Add => buf.push(word::vx_form(d, ah, bh, op::VX_VADDFP)),
                ArithOp::Sub => buf.push(word::vx_form(d, ah, bh, op::VX_VSUBFP)),
                ArithOp::Mul => {
                    // No plain vector multiply on this family; fused
                    // multiply-add against a zeroed addend.
                    let z = SCRATCH_VR_TMP[0];
                    buf.push(word::vx_form(z, z, z, op::VX_VXOR));
                    buf.push(word::va_form(d, ah, z, bh, op::VA_VMADDFP))
                }
            };
        });
        self.note_words(buf.len() - before);
    }

    fn emit_scalar_arith(&self, buf: &mut CodeBuffer, arith: ArithOp, dst: Gpr, a: Gpr, b: Gpr) {
        trace!("scalar arith {:?} {:?} <- {:?}, {:?}", arith, dst, a, b);
        let w = match arith {
            ArithOp::Add => word::xo_form(dst.phys(), a.phys(), b.phys(), op::XO_ADD),
            // subf computes rb - ra, so the operands swap slots.
            ArithOp::Sub => word::xo_form(dst.phys(), b.phys(), a.phys(), op::XO_SUBF),
            ArithOp::Mul => word::xo_form(dst.phys(), a.phys(), b.phys(), op::XO_MULLW),
        };
        buf.push(w);
        self.note_words(1);
    }

    fn emit_logic(&self, buf: &mut CodeBuffer, logic: LogicOp, dst: Vr, a: Vr, b: Vr) {
        trace!("logic {:?} {:?} <- {:?}, {:?}", logic, dst, a, b);
        let xo = match logic {
            LogicOp::And => op::VX_VAND,
            LogicOp::Or => op::VX_VOR,
            LogicOp::Xor => op::VX_VXOR,
        };
        let before = buf.len();
        width::for_each_half(self.config.width, |h| {
            buf.push(word::vx_form(
                width::phys_half(dst, h),
                width::phys_half(a, h),
                width::phys_half(b, h),
                xo,
            ));
        });
        self.note_words(buf.len() - before);
    }

    fn emit_load(&self, buf: &mut CodeBuffer, dst: Vr, mem: MemOperand, disp: Disp) {
        self.emit_vector_mem(buf, dst, mem, disp, op::X_LVX);
    }

    fn emit_store(&self, buf: &mut CodeBuffer, src: Vr, mem: MemOperand, disp: Disp) {
        self.emit_vector_mem(buf, src, mem, disp, op::X_STVX);
    }

    fn emit_scalar_load(&self, buf: &mut CodeBuffer, dst: Gpr, mem: MemOperand, disp: Disp) {
        let before = buf.len();
        let (fields, aux) = resolver::resolve(buf, mem, disp, MemClass::DForm);
        match fields {
            AddrFields::Disp { ra, d } => buf.push(word::d_form(op::LWZ, dst.phys(), ra, d)),
            AddrFields::Indexed { ra, rb } => {
                buf.push(word::x_form(dst.phys(), ra, rb, op::X_LWZX))
            }
        };
        self.note_resolved(buf.len() - before, aux);
    }

    fn emit_scalar_store(&self, buf: &mut CodeBuffer, src: Gpr, mem: MemOperand, disp: Disp) {
        let before = buf.len();
        let (fields, aux) = resolver::resolve(buf, mem, disp, MemClass::DForm);
        match fields {
            AddrFields::Disp { ra, d } => buf.push(word::d_form(op::STW, src.phys(), ra, d)),
            AddrFields::Indexed { ra, rb } => {
                buf.push(word::x_form(src.phys(), ra, rb, op::X_STWX))
            }
        };
        self.note_resolved(buf.len() - before, aux);
    }

    fn emit_jump(&self, buf: &mut CodeBuffer, target: Label) {
        let before = buf.len();
        control::emit_jump(buf, target);
        self.note_branch(buf.len() - before);
    }

    fn emit_cmp_branch(&self, buf: &mut CodeBuffer, cond: Cond, a: Gpr, b: Gpr, target: Label) {
        let before = buf.len();
        control::emit_cmp_branch(buf, cond, a, b, target);
        self.note_branch(buf.len() - before);
    }

    fn emit_lanes_eq(&self, buf: &mut CodeBuffer, mask: Vr, a: Vr, b: Vr) {
        let before = buf.len();
        control::emit_lanes_eq(buf, self.config.width, mask, a, b);
        self.note_words(buf.len() - before);
    }

    fn emit_branch_all_true(&self, buf: &mut CodeBuffer, mask: Vr, target: Label) {
        let before = buf.len();
        control::emit_branch_all_true(buf, self.config.width, mask, target);
        self.note_branch(buf.len() - before);
    }

    fn emit_branch_none_true(&self, buf: &mut CodeBuffer, mask: Vr, target: Label) {
        let before = buf.len();
        control::emit_branch_none_true(buf, self.config.width, mask, target);
        self.note_branch(buf.len() - before);
    }

    fn emit_div(&self, buf: &mut CodeBuffer, dst: Vr, a: Vr, b: Vr) {
        let before = buf.len();
        emulation::emit_div(
            buf,
            self.config.width,
            self.config.strategy(OpFamily::Div),
            dst,
            a,
            b,
            self.config.scratch_base,
        );
        self.note_family(OpFamily::Div, buf.len() - before);
    }

    fn emit_sqrt(&self, buf: &mut CodeBuffer, dst: Vr, a: Vr) {
        let before = buf.len();
        emulation::emit_sqrt(
            buf,
            self.config.width,
            self.config.strategy(OpFamily::Sqrt),
            dst,
            a,
            self.config.scratch_base,
        );
        self.note_family(OpFamily::Sqrt, buf.len() - before);
    }

    fn emit_recip(&self, buf: &mut CodeBuffer, dst: Vr, a: Vr) {
        let before = buf.len();
        emulation::emit_recip(
            buf,
            self.config.width,
            self.config.strategy(OpFamily::Recip),
            dst,
            a,
            self.config.scratch_base,
        );
        self.note_family(OpFamily::Recip, buf.len() - before);
    }

    fn emit_rsqrt(&self, buf: &mut CodeBuffer, dst: Vr, a: Vr) {
        let before = buf.len();
        emulation::emit_rsqrt(
            buf,
            self.config.width,
            self.config.strategy(OpFamily::Rsqrt),
            dst,
            a,
            self.config.scratch_base,
        );
        self.note_family(OpFamily::Rsqrt, buf.len() - before);
    }

    fn emit_fma(&self, buf: &mut CodeBuffer, dst: Vr, a: Vr, b: Vr, c: Vr) {
        let before = buf.len();
        emulation::emit_fma(
            buf,
            self.config.width,
            self.config.strategy(OpFamily::Fma),
            dst,
            a,
            b,
            c,
            self.config.scratch_base,
        );
        self.note_family(OpFamily::Fma, buf.len() - before);
    }

    fn emit_fms(&self, buf: &mut CodeBuffer, dst: Vr, a: Vr, b: Vr, c: Vr) {
        let before = buf.len();
        emulation::emit_fms(
            buf,
            self.config.width,
            self.config.strategy(OpFamily::Fms),
            dst,
            a,
            b,
            c,
            self.config.scratch_base,
        );
        self.note_family(OpFamily::Fms, buf.len() - before);
    }

    fn emit_round(&self, buf: &mut CodeBuffer, dst: Vr, a: Vr, mode: RoundMode) {
        let before = buf.len();
        emulation::emit_round(
            buf,
            self.config.width,
            self.config.strategy(OpFamily::Round),
            dst,
            a,
            mode,
            self.config.scratch_base,
        );
        self.note_family(OpFamily::Round, buf.len() - before);
    }

    fn emit_enter(&self, buf: &mut CodeBuffer, info_base: Gpr) {
        let before = buf.len();
        regs::emit_save_all(buf, &self.layout, info_base);
        self.note_words(buf.len() - before);
    }

    fn emit_leave(&self, buf: &mut CodeBuffer, info_base: Gpr) {
        let before = buf.len();
        regs::emit_load_all(buf, &self.layout, info_base);
        self.note_words(buf.len() - before);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{VectorWidth, FEAT_W128, FEAT_W256};
    use bumpalo::Bump;

    fn native_free_config(width: VectorWidth) -> TargetConfig {
        TargetConfig::new(width)
            .with_strategy(OpFamily::Div, Strategy::Refine)
            .with_strategy(OpFamily::Sqrt, Strategy::Refine)
    }

    #[test]
    fn all_native_configuration_is_rejected() {
        // This family has no full-precision vector divide.
        let err = PpcBackend::new(TargetConfig::new(VectorWidth::W128)).unwrap_err();
        assert!(matches!(
            err,
            EncodeError::UnsupportedStrategy {
                family: OpFamily::Div,
                strategy: Strategy::Native,
            }
        ));
    }

    #[test]
    fn refine_rejected_for_families_without_estimates() {
        let config = native_free_config(VectorWidth::W128)
            .with_strategy(OpFamily::Round, Strategy::Refine);
        let err = PpcBackend::new(config).unwrap_err();
        assert!(matches!(
            err,
            EncodeError::UnsupportedStrategy {
                family: OpFamily::Round,
                strategy: Strategy::Refine,
            }
        ));
    }

    #[test]
    fn feature_bits_reflect_configuration() {
        let backend = PpcBackend::new(native_free_config(VectorWidth::W128)).unwrap();
        let feats = backend.features();
        assert_ne!(feats & FEAT_W128, 0);
        assert_eq!(feats & FEAT_W256, 0);
        assert_ne!(feats & FEAT_NATIVE_FMA, 0);
        assert_ne!(feats & FEAT_NATIVE_ROUND, 0);
        assert_eq!(feats & FEAT_SCALAR_SLOTS, 0);

        let fallback = PpcBackend::new(
            native_free_config(VectorWidth::W256)
                .with_strategy(OpFamily::Div, Strategy::ScalarFallback),
        )
        .unwrap();
        assert_ne!(fallback.features() & FEAT_SCALAR_SLOTS, 0);
        assert_ne!(fallback.features() & FEAT_W256, 0);
    }

    #[test]
    fn arith_add_is_one_word_per_half() {
        let backend = PpcBackend::new(native_free_config(VectorWidth::W512)).unwrap();
        let mut buf = CodeBuffer::new();
        backend.emit_arith(&mut buf, ArithOp::Add, Vr::V2, Vr::V0, Vr::V1);
        let words = buf.finalize().unwrap();
        assert_eq!(words.len(), 4);
        for (h, w) in words.iter().enumerate() {
            assert_eq!(word::decode_vx_xo(*w), op::VX_VADDFP);
            assert_eq!(word::decode_rt(*w), Vr::V2.phys_base() + h as u8);
            assert_eq!(word::decode_ra(*w), Vr::V0.phys_base() + h as u8);
            assert_eq!(word::decode_rb(*w), Vr::V1.phys_base() + h as u8);
        }
    }

    #[test]
    fn mul_routes_through_fused_multiply() {
        let backend = PpcBackend::new(native_free_config(VectorWidth::W128)).unwrap();
        let mut buf = CodeBuffer::new();
        backend.emit_arith(&mut buf, ArithOp::Mul, Vr::V2, Vr::V0, Vr::V1);
        let words = buf.finalize().unwrap();
        assert_eq!(words.len(), 2);
        assert_eq!(word::decode_vx_xo(words[0]), op::VX_VXOR);
        assert_eq!(word::decode_va_xo(words[1]), op::VA_VMADDFP);
        assert_eq!(word::decode_va_vc(words[1]), Vr::V1.phys_base());
    }

    #[test]
    fn scalar_arith_uses_the_arithmetic_layout() {
        let backend = PpcBackend::new(native_free_config(VectorWidth::W128)).unwrap();
        let mut buf = CodeBuffer::new();
        backend.emit_scalar_arith(&mut buf, ArithOp::Add, Gpr::G0, Gpr::G1, Gpr::G2);
        backend.emit_scalar_arith(&mut buf, ArithOp::Sub, Gpr::G0, Gpr::G1, Gpr::G2);
        backend.emit_scalar_arith(&mut buf, ArithOp::Mul, Gpr::G0, Gpr::G1, Gpr::G2);
        let words = buf.finalize().unwrap();
        assert_eq!(words.len(), 3);
        for w in &words {
            assert_eq!(word::decode_opcd(*w), op::MAJOR_X);
            assert_eq!(word::decode_rt(*w), Gpr::G0.phys());
        }
        assert_eq!(word::decode_xo_xo(words[0]), op::XO_ADD);
        assert_eq!(word::decode_xo_xo(words[1]), op::XO_SUBF);
        assert_eq!(word::decode_xo_xo(words[2]), op::XO_MULLW);
        // subf computes rb - ra: the minuend lands in the rb slot.
        assert_eq!(word::decode_ra(words[1]), Gpr::G2.phys());
        assert_eq!(word::decode_rb(words[1]), Gpr::G1.phys());
    }

    #[test]
    fn lane_equality_compares_as_floats() {
        let backend = PpcBackend::new(native_free_config(VectorWidth::W128)).unwrap();
        let mut buf = CodeBuffer::new();
        backend.emit_lanes_eq(&mut buf, Vr::V5, Vr::V0, Vr::V1);
        let words = buf.finalize().unwrap();
        assert_eq!(words.len(), 1);
        assert_eq!(word::decode_vxr_xo(words[0]), op::VXR_VCMPEQFP);
    }

    #[test]
    fn wide_load_steps_the_displacement() {
        let backend = PpcBackend::new(native_free_config(VectorWidth::W256)).unwrap();
        let mut buf = CodeBuffer::new();
        backend.emit_load(&mut buf, Vr::V0, MemOperand::offset(Gpr::G1), Disp::ZERO);
        let words = buf.finalize().unwrap();
        // Half 0: canonical zero-offset lvx. Half 1: li 16 + lvx.
        assert_eq!(words.len(), 3);
        assert_eq!(word::decode_x_xo(words[0]), op::X_LVX);
        assert_eq!(word::decode_opcd(words[1]), op::ADDI);
        assert_eq!(word::decode_d(words[1]), 16);
        assert_eq!(word::decode_x_xo(words[2]), op::X_LVX);
    }

    #[test]
    fn session_counts_words_and_families() {
        let arena = Bump::new();
        let session = EncodingSession::new(&arena);
        let backend = PpcBackend::new(native_free_config(VectorWidth::W128))
            .unwrap()
            .with_session(&session);

        let mut buf = CodeBuffer::new();
        backend.emit_arith(&mut buf, ArithOp::Add, Vr::V2, Vr::V0, Vr::V1);
        backend.emit_recip(&mut buf, Vr::V3, Vr::V0);
        let exit = buf.create_label();
        backend.emit_jump(&mut buf, exit);
        buf.bind_label(exit);

        let stats = session.stats();
        assert_eq!(stats.words_emitted, buf.len());
        assert_eq!(stats.hits(OpFamily::Recip), 1);
        assert_eq!(stats.hits(OpFamily::Div), 0);
        assert_eq!(stats.branches, 1);
        buf.finalize().unwrap();
    }

    #[test]
    fn enter_and_leave_words_pair_up() {
        let backend = PpcBackend::new(
            native_free_config(VectorWidth::W256)
                .with_strategy(OpFamily::Sqrt, Strategy::ScalarFallback),
        )
        .unwrap();
        let mut save = CodeBuffer::new();
        let mut load = CodeBuffer::new();
        backend.emit_enter(&mut save, Gpr::G0);
        backend.emit_leave(&mut load, Gpr::G0);
        // Save carries one extra word: the mask-reference materialization.
        assert_eq!(
            save.finalize().unwrap().len(),
            load.finalize().unwrap().len() + 1
        );
    }
}
