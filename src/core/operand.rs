// This module defines the portable operand namespace of the encoding engine: the abstract
// register descriptors callers use to state operations, memory operands, and
// displacement values. Portable names never alias the scratch registers the backends
// reserve internally (that reservation is a compile-time constant set, checked by tests,
// never mutated at run time). Gpr covers the general-purpose file (base/index capable),
// Vr the vector file (not addressable as base/index). MemOperand is constructed per
// load/store/address-taking call and consumed immediately by the addressing resolver;
// it is never retained. Physical encoding numbers live here so that every backend maps
// the same portable name to the same descriptor data, while the per-width physical
// placement of vector halves is the width-composition layer's concern.

//! Portable operand and addressing model.

/// Physical register encoding number as placed into instruction fields.
pub type PhysReg = u8;

/// Role tag describing how a register may participate in addressing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrRole {
    /// Usable as a base or index register in memory operands.
    BaseIndex,
    /// Never appears in an address computation (vector file).
    DataOnly,
}

/// Portable general-purpose register name.
///
/// Maps onto r14..r23 of the physical file; r11/r12 remain backend scratch
/// and r0 is the literal-zero slot of indexed address forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Gpr {
    G0 = 0,
    G1 = 1,
    G2 = 2,
    G3 = 3,
    G4 = 4,
    G5 = 5,
    G6 = 6,
    G7 = 7,
    G8 = 8,
    G9 = 9,
}

impl Gpr {
    /// All portable GP names in index order.
    pub const ALL: [Gpr; 10] = [
        Gpr::G0,
        Gpr::G1,
        Gpr::G2,
        Gpr::G3,
        Gpr::G4,
        Gpr::G5,
        Gpr::G6,
        Gpr::G7,
        Gpr::G8,
        Gpr::G9,
    ];

    /// First physical register backing the portable GP file.
    pub const PHYS_BASE: PhysReg = 14;

    /// Index within the portable namespace.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Physical encoding number placed into instruction fields.
    pub const fn phys(self) -> PhysReg {
        Self::PHYS_BASE + self as PhysReg
    }

    pub const fn role(self) -> AddrRole {
        AddrRole::BaseIndex
    }
}

/// Portable vector register name.
///
/// Each name owns the physical quad `v(4n)..v(4n+3)` so the same portable
/// namespace is valid at every composed width; which halves of the quad are
/// live depends on the configured width (see `ppc::width`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Vr {
    V0 = 0,
    V1 = 1,
    V2 = 2,
    V3 = 3,
    V4 = 4,
    V5 = 5,
}

impl Vr {
    /// All portable vector names in index order.
    pub const ALL: [Vr; 6] = [Vr::V0, Vr::V1, Vr::V2, Vr::V3, Vr::V4, Vr::V5];

    /// Index within the portable namespace.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Physical number of the first (lowest) native-width half.
    pub const fn phys_base(self) -> PhysReg {
        (self as PhysReg) * 4
    }

    pub const fn role(self) -> AddrRole {
        AddrRole::DataOnly
    }
}

/// Addressing-mode tag of a memory operand. The indexed tag carries its
/// index register, so an indexed operand without one cannot be constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressMode {
    /// Base register plus displacement.
    Offset,
    /// Base register plus index register. A nonzero displacement combined
    /// with this mode is a caller contract violation.
    Indexed(Gpr),
}

/// Memory operand: base register plus addressing-mode tag.
///
/// Constructed by the caller for each memory-touching operation and consumed
/// immediately by the addressing resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemOperand {
    pub base: Gpr,
    pub mode: AddressMode,
}

impl MemOperand {
    /// Base + displacement operand.
    pub const fn offset(base: Gpr) -> Self {
        Self {
            base,
            mode: AddressMode::Offset,
        }
    }

    /// Base + index operand.
    pub const fn indexed(base: Gpr, index: Gpr) -> Self {
        Self {
            base,
            mode: AddressMode::Indexed(index),
        }
    }
}

/// Displacement value, classified into encoding tiers by the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Disp(pub i32);

impl Disp {
    pub const ZERO: Disp = Disp(0);

    /// Whether the value fits the signed 16-bit immediate field directly.
    pub const fn fits_direct(self) -> bool {
        self.0 >= i16::MIN as i32 && self.0 <= i16::MAX as i32
    }
}
