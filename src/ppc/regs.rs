// This module fixes the physical register map of the ppc backend: which physical
// registers back the portable namespace, the compile-time scratch reservation the
// resolver and emulation layers consume internally, and the save/restore layout that
// brackets a region of emitted code. The scratch set is a constant reservation, never
// mutated at run time, and never collides with a portable name (checked by tests against
// the operand module's mapping). SaveLayout computes the field order of the register-
// state block once from a target configuration: 10 GP slots, the portable vector file at
// the configured logical width, and two scalar transfer slots appended only when some
// operation family routes through the scalar fallback. Both halves of one bracket must
// be emitted from the same layout; mixing configurations across a bracket is a caller
// contract violation.

//! Physical register map, scratch reservation, save/restore layout.

use log::trace;

use crate::core::buffer::CodeBuffer;
use crate::core::config::TargetConfig;
use crate::core::operand::{Gpr, PhysReg, Vr};

use super::width;
use super::word::{self, op};

/// GP scratch pair used by displacement materialization and fallback addressing.
pub const SCRATCH_GPR: [PhysReg; 2] = [11, 12];

/// FP scratch pair used by scalar-fallback lane transfers.
pub const SCRATCH_FPR: [PhysReg; 2] = [12, 13];

/// Vector scratch: two temporaries, the all-ones mask reference, one constant.
pub const SCRATCH_VR_TMP: [PhysReg; 2] = [28, 29];
pub const MASK_ONES_VR: PhysReg = 30;
pub const CONST_VR: PhysReg = 31;

/// The literal-zero slot of indexed address forms.
pub const ZERO_SLOT: PhysReg = 0;

/// Save/restore block layout for one target configuration.
///
/// Field order is fixed: GP file, vector file (all halves of each portable
/// name, low half first), then the optional scalar transfer slots. The
/// caller's block must be 16-byte aligned: the vector transfers ignore the
/// low four address bits, so a misaligned block silently shears the vector
/// slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveLayout {
    halves: usize,
    scalar_slots: bool,
}

impl SaveLayout {
    pub fn for_config(config: &TargetConfig) -> Self {
        Self {
            halves: config.width.halves(),
            scalar_slots: config.any_scalar_fallback(),
        }
    }

    /// Byte offset of one portable GP register's slot.
    pub const fn gpr_offset(&self, index: usize) -> i32 {
        (index * 4) as i32
    }

    /// Start of the vector area, aligned to the 16-byte vector access unit.
    pub const fn vec_base(&self) -> i32 {
        48
    }

    /// Byte offset of one native-width half of one portable vector register.
    pub const fn vec_offset(&self, vr_index: usize, half: usize) -> i32 {
        self.vec_base() + ((vr_index * self.halves + half) * 16) as i32
    }

    /// Byte offset of one scalar transfer slot, if the layout carries them.
    pub const fn scalar_slot_offset(&self, slot: usize) -> i32 {
        self.vec_base() + (Vr::ALL.len() * self.halves * 16) as i32 + (slot * 8) as i32
    }

    /// Total block size the caller must reserve.
    pub const fn total_size(&self) -> i32 {
        let vec_end = self.vec_base() + (Vr::ALL.len() * self.halves * 16) as i32;
        if self.scalar_slots {
            vec_end + 16
        } else {
            vec_end
        }
    }

    pub const fn has_scalar_slots(&self) -> bool {
        self.scalar_slots
    }
}

/// Serialize the full portable register file into the caller's block.
///
/// Emits D-form stores for the GP file and indexed vector stores with the
/// offset materialized into scratch (the vector unit has no displacement
/// form); finishes by re-materializing the all-ones mask reference.
pub fn emit_save_all(buf: &mut CodeBuffer, layout: &SaveLayout, info_base: Gpr) {
    let base = info_base.phys();
    trace!("save-all: {} bytes at r{}", layout.total_size(), base);

    // The block pointer's own slot records the pointer value.
    for g in Gpr::ALL {
        buf.push(word::d_form(op::STW, g.phys(), base, layout.gpr_offset(g.index()) as i16));
    }

    // Vector slots start at vec_base, so every offset is nonzero and gets
    // materialized into scratch for the indexed store.
    for v in Vr::ALL {
        for half in 0..layout.halves {
            let off = layout.vec_offset(v.index(), half);
            let vr = width::phys_half(v, half);
            buf.push(word::li(SCRATCH_GPR[0], off as i16));
            buf.push(word::x_form(vr, base, SCRATCH_GPR[0], op::X_STVX));
        }
    }

    if layout.has_scalar_slots() {
        for (slot, fpr) in SCRATCH_FPR.iter().enumerate() {
            buf.push(word::d_form(
                op::STFD,
                *fpr,
                base,
                layout.scalar_slot_offset(slot) as i16,
            ));
        }
    }

    // The mask-reduction reference register is scratch; (re)materialize it on
    // region entry so reductions inside the bracket can rely on it.
    buf.push(word::vx_splat_form(MASK_ONES_VR, -1, op::VX_VSPLTISW));
}

/// Restore the full portable register file from the caller's block.
///
/// Must mirror `emit_save_all` slot-for-slot for the same layout.
pub fn emit_load_all(buf: &mut CodeBuffer, layout: &SaveLayout, info_base: Gpr) {
    let base = info_base.phys();
    trace!("load-all: {} bytes at r{}", layout.total_size(), base);

    if layout.has_scalar_slots() {
        for (slot, fpr) in SCRATCH_FPR.iter().enumerate() {
            buf.push(word::d_form(
                op::LFD,
                *fpr,
                base,
                layout.scalar_slot_offset(slot) as i16,
            ));
        }
    }

    for v in Vr::ALL {
        for half in 0..layout.halves {
            let off = layout.vec_offset(v.index(), half);
            let vr = width::phys_half(v, half);
            buf.push(word::li(SCRATCH_GPR[0], off as i16));
            buf.push(word::x_form(vr, base, SCRATCH_GPR[0], op::X_LVX));
        }
    }

    // GP file last so the block pointer stays valid until the end.
    for g in Gpr::ALL {
        buf.push(word::d_form(op::LWZ, g.phys(), base, layout.gpr_offset(g.index()) as i16));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{OpFamily, Strategy, VectorWidth};

    #[test]
    fn scratch_never_collides_with_portable() {
        for g in Gpr::ALL {
            assert!(!SCRATCH_GPR.contains(&g.phys()));
        }
        for v in Vr::ALL {
            for half in 0..4 {
                let phys = width::phys_half(v, half);
                assert!(!SCRATCH_VR_TMP.contains(&phys));
                assert_ne!(phys, MASK_ONES_VR);
                assert_ne!(phys, CONST_VR);
            }
        }
    }

    #[test]
    fn layout_sizes_depend_on_config() {
        let narrow = SaveLayout::for_config(&TargetConfig::new(VectorWidth::W128));
        let wide = SaveLayout::for_config(&TargetConfig::new(VectorWidth::W512));
        let fallback = SaveLayout::for_config(
            &TargetConfig::new(VectorWidth::W128)
                .with_strategy(OpFamily::Div, Strategy::ScalarFallback),
        );

        assert_eq!(narrow.total_size(), 48 + 6 * 16);
        assert_eq!(wide.total_size(), 48 + 6 * 4 * 16);
        assert_eq!(fallback.total_size(), narrow.total_size() + 16);
        assert!(!narrow.has_scalar_slots());
        assert!(fallback.has_scalar_slots());
    }

    #[test]
    fn vector_slots_are_contiguous_low_half_first() {
        let layout = SaveLayout::for_config(&TargetConfig::new(VectorWidth::W256));
        assert_eq!(layout.vec_offset(0, 0), 48);
        assert_eq!(layout.vec_offset(0, 1), 64);
        assert_eq!(layout.vec_offset(1, 0), 80);
    }

    #[test]
    fn save_and_load_emit_matching_slot_counts() {
        let cfg = TargetConfig::new(VectorWidth::W256)
            .with_strategy(OpFamily::Sqrt, Strategy::ScalarFallback);
        let layout = SaveLayout::for_config(&cfg);

        let mut save = CodeBuffer::new();
        emit_save_all(&mut save, &layout, Gpr::G0);
        let mut load = CodeBuffer::new();
        emit_load_all(&mut load, &layout, Gpr::G0);

        // save carries one extra word: the mask-reference materialization.
        assert_eq!(save.len(), load.len() + 1);
    }

    /// Decode a save or load stream into (file, register, byte offset)
    /// triples. Vector transfers carry their offset in the preceding li.
    fn slot_map(words: &[u32]) -> Vec<(&'static str, u8, i32)> {
        let mut slots = Vec::new();
        let mut pending_off = None;
        for &w in words {
            match word::decode_opcd(w) {
                op::STW | op::LWZ => {
                    slots.push(("gp", word::decode_rt(w), word::decode_d(w) as i32))
                }
                op::STFD | op::LFD => {
                    slots.push(("fp", word::decode_rt(w), word::decode_d(w) as i32))
                }
                op::ADDI => pending_off = Some(word::decode_d(w) as i32),
                op::MAJOR_X => {
                    assert!(matches!(word::decode_x_xo(w), op::X_STVX | op::X_LVX));
                    let off = pending_off.take().unwrap();
                    slots.push(("vec", word::decode_rt(w), off));
                }
                // The mask-reference materialization on the save side.
                _ => assert_eq!(word::decode_vx_xo(w), op::VX_VSPLTISW),
            }
        }
        slots.sort_unstable();
        slots
    }

    #[test]
    fn save_and_load_address_identical_slots() {
        let cfg = TargetConfig::new(VectorWidth::W256)
            .with_strategy(OpFamily::Sqrt, Strategy::ScalarFallback);
        let layout = SaveLayout::for_config(&cfg);

        let mut save = CodeBuffer::new();
        emit_save_all(&mut save, &layout, Gpr::G0);
        let mut load = CodeBuffer::new();
        emit_load_all(&mut load, &layout, Gpr::G0);

        let saved = slot_map(save.words());
        let loaded = slot_map(load.words());

        // Every (register, offset) pair written by save is read back by
        // load, and nothing else; program order may differ, the memory
        // field order may not.
        assert_eq!(saved, loaded);
        assert_eq!(
            saved.iter().filter(|(file, _, _)| *file == "gp").count(),
            Gpr::ALL.len()
        );
        assert_eq!(
            saved.iter().filter(|(file, _, _)| *file == "vec").count(),
            Vr::ALL.len() * layout.halves
        );
        assert_eq!(saved.iter().filter(|(file, _, _)| *file == "fp").count(), 2);
    }

    #[test]
    fn save_all_ends_with_mask_reference() {
        let layout = SaveLayout::for_config(&TargetConfig::new(VectorWidth::W128));
        let mut buf = CodeBuffer::new();
        emit_save_all(&mut buf, &layout, Gpr::G0);
        let last = *buf.words().last().unwrap();
        assert_eq!(word::decode_vx_xo(last), op::VX_VSPLTISW);
        assert_eq!(word::decode_rt(last), MASK_ONES_VR);
    }
}
