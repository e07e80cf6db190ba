// This module is the instruction word builder for the POWER-style family: pure, side-
// effect-free composition of 32-bit words from an opcode base pattern and pre-resolved
// operand fields, one composition rule per instruction format family. D-form carries a
// signed 16-bit displacement/immediate; XO-form is the arithmetic layout (destination
// first, 9-bit extended opcode); X-form is the logic/shift/indexed-memory layout (source
// first, 10-bit extended opcode); B/I-form are the branch layouts whose displacement
// fields are patched at buffer finalize; VX/VA/VXR-form cover the 128-bit vector unit;
// A-form covers the scalar floating-point unit the fallback paths route through. The
// opcode tables here are the single source of truth: the decode helpers at the bottom
// mirror the builders field-for-field and are what the round-trip tests use. No range
// checking happens here beyond what the resolved fields already guarantee.

//! 32-bit instruction word composition, one rule per format family.

/// Primary and extended opcode constants.
pub mod op {
    // D-form primaries.
    pub const ADDI: u32 = 14;
    pub const ADDIS: u32 = 15;
    pub const ORI: u32 = 24;
    pub const LWZ: u32 = 32;
    pub const STW: u32 = 36;
    pub const LFS: u32 = 48;
    pub const STFS: u32 = 52;
    pub const LFD: u32 = 50;
    pub const STFD: u32 = 54;

    // Branch primaries.
    pub const BC: u32 = 16;
    pub const B: u32 = 18;

    // Major 31 extended opcodes (X/XO-form).
    pub const MAJOR_X: u32 = 31;
    pub const XO_ADD: u32 = 266;
    pub const XO_SUBF: u32 = 40;
    pub const XO_MULLW: u32 = 235;
    pub const X_AND: u32 = 28;
    pub const X_LWZX: u32 = 23;
    pub const X_STWX: u32 = 151;
    pub const X_LVX: u32 = 103;
    pub const X_STVX: u32 = 231;

    // Major 4 vector extended opcodes.
    pub const MAJOR_V: u32 = 4;
    pub const VX_VADDFP: u32 = 10;
    pub const VX_VSUBFP: u32 = 74;
    pub const VX_VREFP: u32 = 266;
    pub const VX_VRSQRTEFP: u32 = 330;
    pub const VX_VRFIN: u32 = 522;
    pub const VX_VRFIZ: u32 = 586;
    pub const VX_VRFIP: u32 = 650;
    pub const VX_VRFIM: u32 = 714;
    pub const VX_VAND: u32 = 1028;
    pub const VX_VOR: u32 = 1156;
    pub const VX_VXOR: u32 = 1220;
    pub const VX_VSPLTISW: u32 = 908;
    pub const VX_VCFSX: u32 = 842;
    pub const VA_VMADDFP: u32 = 46;
    pub const VA_VNMSUBFP: u32 = 47;
    pub const VXR_VCMPEQUW: u32 = 134;
    pub const VXR_VCMPEQFP: u32 = 198;

    // Major 59/63 scalar floating-point extended opcodes.
    pub const MAJOR_FPS: u32 = 59;
    pub const MAJOR_FPD: u32 = 63;
    pub const A_FDIVS: u32 = 18;
    pub const A_FSQRTS: u32 = 22;
    pub const A_FMADDS: u32 = 29;
    pub const A_FNMSUBS: u32 = 30;
    pub const X_FNEG: u32 = 40;
    pub const X_FRIN: u32 = 392;
    pub const X_FRIZ: u32 = 456;
    pub const X_FRIP: u32 = 424;
    pub const X_FRIM: u32 = 488;
}

/// D-form: primary, target/source, base, signed 16-bit displacement or immediate.
pub const fn d_form(opcd: u32, rt: u8, ra: u8, d: i16) -> u32 {
    (opcd << 26) | ((rt as u32) << 21) | ((ra as u32) << 16) | (d as u16 as u32)
}

/// XO-form, the arithmetic layout: destination in the high slot, 9-bit
/// extended opcode at bit 1.
pub const fn xo_form(rt: u8, ra: u8, rb: u8, xo: u32) -> u32 {
    (op::MAJOR_X << 26)
        | ((rt as u32) << 21)
        | ((ra as u32) << 16)
        | ((rb as u32) << 11)
        | (xo << 1)
}

/// X-form, the logic/shift and indexed-memory layout: source (or vector
/// target for lvx/stvx) in the high slot, 10-bit extended opcode at bit 1.
pub const fn x_form(rst: u8, ra: u8, rb: u8, xo: u32) -> u32 {
    (op::MAJOR_X << 26)
        | ((rst as u32) << 21)
        | ((ra as u32) << 16)
        | ((rb as u32) << 11)
        | (xo << 1)
}

/// Compare: crf selects the condition field, registers in the X-form slots.
pub const fn cmp_form(crf: u8, ra: u8, rb: u8) -> u32 {
    (op::MAJOR_X << 26) | ((crf as u32) << 23) | ((ra as u32) << 16) | ((rb as u32) << 11)
}

/// I-form unconditional branch; 26-bit displacement patched at finalize.
pub const fn i_form() -> u32 {
    op::B << 26
}

/// B-form conditional branch on (bo, bi); displacement patched at finalize.
pub const fn b_form(bo: u8, bi: u8) -> u32 {
    (op::BC << 26) | ((bo as u32) << 21) | ((bi as u32) << 16)
}

/// VX-form vector op with an 11-bit extended opcode.
pub const fn vx_form(vt: u8, va: u8, vb: u8, xo: u32) -> u32 {
    (op::MAJOR_V << 26) | ((vt as u32) << 21) | ((va as u32) << 16) | ((vb as u32) << 11) | xo
}

/// VX-form splat immediate: 5-bit signed immediate in the va slot.
pub const fn vx_splat_form(vt: u8, simm: i8, xo: u32) -> u32 {
    (op::MAJOR_V << 26) | ((vt as u32) << 21) | (((simm as u32) & 0x1F) << 16) | xo
}

/// VX-form convert with unsigned scale in the va slot.
pub const fn vx_scale_form(vt: u8, vb: u8, scale: u8, xo: u32) -> u32 {
    (op::MAJOR_V << 26)
        | ((vt as u32) << 21)
        | ((scale as u32) << 16)
        | ((vb as u32) << 11)
        | xo
}

/// VA-form four-operand vector op (fused multiply family).
pub const fn va_form(vt: u8, va: u8, vb: u8, vc: u8, xo: u32) -> u32 {
    (op::MAJOR_V << 26)
        | ((vt as u32) << 21)
        | ((va as u32) << 16)
        | ((vb as u32) << 11)
        | ((vc as u32) << 6)
        | xo
}

/// VXR-form vector compare; the record bit mirrors the lane reduction into
/// the condition register's sixth field.
pub const fn vxr_form(vt: u8, va: u8, vb: u8, record: bool, xo: u32) -> u32 {
    (op::MAJOR_V << 26)
        | ((vt as u32) << 21)
        | ((va as u32) << 16)
        | ((vb as u32) << 11)
        | ((record as u32) << 10)
        | xo
}

/// A-form scalar floating-point op with a 5-bit extended opcode.
pub const fn a_form(opcd: u32, frt: u8, fra: u8, frb: u8, frc: u8, xo: u32) -> u32 {
    (opcd << 26)
        | ((frt as u32) << 21)
        | ((fra as u32) << 16)
        | ((frb as u32) << 11)
        | ((frc as u32) << 6)
        | (xo << 1)
}

/// X-form scalar floating-point unary (fneg, directed rounding).
pub const fn fp_x_form(frt: u8, frb: u8, xo: u32) -> u32 {
    (op::MAJOR_FPD << 26) | ((frt as u32) << 21) | ((frb as u32) << 11) | (xo << 1)
}

// Commonly-materialized pseudo ops.

/// li rt, imm (addi rt, 0, imm).
pub const fn li(rt: u8, imm: i16) -> u32 {
    d_form(op::ADDI, rt, 0, imm)
}

/// lis rt, imm (addis rt, 0, imm).
pub const fn lis(rt: u8, imm: i16) -> u32 {
    d_form(op::ADDIS, rt, 0, imm)
}

/// ori ra, rs, uimm. Note the D-form slots swap: source in the high slot.
pub const fn ori(ra: u8, rs: u8, uimm: u16) -> u32 {
    (op::ORI << 26) | ((rs as u32) << 21) | ((ra as u32) << 16) | (uimm as u32)
}

// Field decode helpers, mirroring the builders.

pub const fn decode_opcd(word: u32) -> u32 {
    word >> 26
}

pub const fn decode_rt(word: u32) -> u8 {
    ((word >> 21) & 0x1F) as u8
}

pub const fn decode_ra(word: u32) -> u8 {
    ((word >> 16) & 0x1F) as u8
}

pub const fn decode_rb(word: u32) -> u8 {
    ((word >> 11) & 0x1F) as u8
}

pub const fn decode_d(word: u32) -> i16 {
    (word & 0xFFFF) as u16 as i16
}

pub const fn decode_x_xo(word: u32) -> u32 {
    (word >> 1) & 0x3FF
}

pub const fn decode_xo_xo(word: u32) -> u32 {
    (word >> 1) & 0x1FF
}

pub const fn decode_vx_xo(word: u32) -> u32 {
    word & 0x7FF
}

pub const fn decode_va_xo(word: u32) -> u32 {
    word & 0x3F
}

pub const fn decode_va_vc(word: u32) -> u8 {
    ((word >> 6) & 0x1F) as u8
}

pub const fn decode_vxr_xo(word: u32) -> u32 {
    word & 0x3FF
}

pub const fn decode_vxr_record(word: u32) -> bool {
    (word >> 10) & 1 == 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn d_form_roundtrip() {
        let w = d_form(op::LWZ, 3, 14, -4);
        assert_eq!(decode_opcd(w), op::LWZ);
        assert_eq!(decode_rt(w), 3);
        assert_eq!(decode_ra(w), 14);
        assert_eq!(decode_d(w), -4);
    }

    #[test]
    fn arithmetic_layout_differs_from_logic_layout() {
        // add r3,r14,r15 places the destination in the high slot; and
        // r3,r14,r15 places the source there. Same field offsets, different
        // composition rules and extended-opcode widths.
        let add = xo_form(3, 14, 15, op::XO_ADD);
        let and = x_form(14, 3, 15, op::X_AND);
        assert_eq!(decode_xo_xo(add), op::XO_ADD);
        assert_eq!(decode_x_xo(and), op::X_AND);
        assert_eq!(decode_rt(add), 3);
        assert_eq!(decode_ra(and), 3);
    }

    #[test]
    fn known_encodings() {
        // add r3,r4,r5 = 0x7C642A14
        assert_eq!(xo_form(3, 4, 5, op::XO_ADD), 0x7C64_2A14);
        // lwz r3,8(r4) = 0x80640008
        assert_eq!(d_form(op::LWZ, 3, 4, 8), 0x8064_0008);
        // li r11,16 = addi r11,0,16 = 0x39600010
        assert_eq!(li(11, 16), 0x3960_0010);
        // vaddfp v1,v2,v3 = 0x1022180A
        assert_eq!(vx_form(1, 2, 3, op::VX_VADDFP), 0x1022_180A);
        // fdivs f12,f12,f13 = major 59
        let w = a_form(op::MAJOR_FPS, 12, 12, 13, 0, op::A_FDIVS);
        assert_eq!(decode_opcd(w), op::MAJOR_FPS);
        assert_eq!(decode_rt(w), 12);
    }

    #[test]
    fn vector_form_fields() {
        let w = va_form(1, 2, 3, 4, op::VA_VMADDFP);
        assert_eq!(decode_rt(w), 1);
        assert_eq!(decode_ra(w), 2);
        assert_eq!(decode_rb(w), 3);
        assert_eq!(decode_va_vc(w), 4);
        assert_eq!(decode_va_xo(w), op::VA_VMADDFP);

        let w = vxr_form(28, 28, 30, true, op::VXR_VCMPEQUW);
        assert!(decode_vxr_record(w));
        assert_eq!(decode_vxr_xo(w), op::VXR_VCMPEQUW);

        let w = vx_splat_form(30, -1, op::VX_VSPLTISW);
        assert_eq!(decode_ra(w), 0x1F); // -1 in the 5-bit immediate slot
        assert_eq!(decode_vx_xo(w), op::VX_VSPLTISW);
    }

    #[test]
    fn ori_slot_swap() {
        // ori r11,r11,0x1234: source r11 in the high slot.
        let w = ori(11, 11, 0x1234);
        assert_eq!(decode_opcd(w), op::ORI);
        assert_eq!(decode_rt(w), 11);
        assert_eq!(decode_ra(w), 11);
        assert_eq!(w & 0xFFFF, 0x1234);
    }

    #[test]
    fn branch_bases_have_zero_displacement() {
        assert_eq!(i_form() & 0x03FF_FFFC, 0);
        assert_eq!(b_form(12, 24) & 0xFFFC, 0);
        assert_eq!(decode_opcd(i_form()), op::B);
        assert_eq!(decode_opcd(b_form(12, 24)), op::BC);
    }
}
