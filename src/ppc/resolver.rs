// This module is the operand and addressing resolver for the ppc backend. Given a memory
// operand and a displacement, it selects the smallest displacement-encoding tier that can
// represent the value for the requested instruction class, emits the auxiliary words that
// tier implies (nothing for Direct, one load-immediate into scratch for Materialize, a
// high/low split pair for Split), and returns the final address fields the word builder
// consumes. Scalar classes have a displacement form, so their Materialize tier never
// triggers by magnitude; the vector class is indexed-only, so any nonzero displacement
// at least materializes. A zero displacement always takes the canonical no-offset
// encoding (D=0, or the literal-zero slot of the indexed form), never a degenerate
// scratch load. Passing a displacement alongside an Indexed-mode operand is a caller
// contract violation, checked only in debug builds.

//! Displacement tier selection and address materialization.

use log::debug;

use crate::core::buffer::CodeBuffer;
use crate::core::operand::{AddressMode, Disp, MemOperand, PhysReg};

use super::regs::{SCRATCH_GPR, ZERO_SLOT};
use super::word;

/// Displacement-encoding tier, by magnitude and instruction class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispTier {
    /// Fits the instruction's own displacement field.
    Direct,
    /// One load-immediate into scratch (indexed-only classes).
    Materialize,
    /// High/low split load into scratch.
    Split,
}

/// Instruction class from the resolver's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemClass {
    /// Has a D-form: the word itself carries a signed 16-bit displacement.
    DForm,
    /// Indexed-only (vector unit): every address is base + index register.
    IndexedOnly,
}

/// Final address fields handed to the word builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrFields {
    /// D-form encoding: base register and in-word displacement.
    Disp { ra: PhysReg, d: i16 },
    /// X-form indexed encoding: `ra` may be the literal-zero slot.
    Indexed { ra: PhysReg, rb: PhysReg },
}

/// Classify a displacement into the smallest representable tier.
pub const fn classify(disp: Disp, class: MemClass) -> DispTier {
    match class {
        MemClass::DForm => {
            if disp.fits_direct() {
                DispTier::Direct
            } else {
                DispTier::Split
            }
        }
        MemClass::IndexedOnly => {
            if disp.0 == 0 {
                DispTier::Direct
            } else if disp.fits_direct() {
                DispTier::Materialize
            } else {
                DispTier::Split
            }
        }
    }
}

/// Resolve a memory operand and displacement for the given class.
///
/// Emits the tier's auxiliary words (in order, before the consuming
/// instruction) and returns the final fields. Returns the number of aux
/// words alongside so sessions can account for them.
pub fn resolve(
    buf: &mut CodeBuffer,
    mem: MemOperand,
    disp: Disp,
    class: MemClass,
) -> (AddrFields, usize) {
    if let AddressMode::Indexed(index) = mem.mode {
        debug_assert_eq!(disp.0, 0, "displacement with indexed operand");
        return (
            AddrFields::Indexed {
                ra: mem.base.phys(),
                rb: index.phys(),
            },
            0,
        );
    }

    let tier = classify(disp, class);
    debug!("resolve {:?} {:?} -> {:?}", class, disp, tier);
    match (class, tier) {
        (MemClass::DForm, DispTier::Direct) => (
            AddrFields::Disp {
                ra: mem.base.phys(),
                d: disp.0 as i16,
            },
            0,
        ),
        (MemClass::IndexedOnly, DispTier::Direct) => (
            // Canonical no-offset form: base in the index slot, literal zero
            // in the base slot.
            AddrFields::Indexed {
                ra: ZERO_SLOT,
                rb: mem.base.phys(),
            },
            0,
        ),
        (_, DispTier::Materialize) => {
            buf.push(word::li(SCRATCH_GPR[0], disp.0 as i16));
            (
                AddrFields::Indexed {
                    ra: mem.base.phys(),
                    rb: SCRATCH_GPR[0],
                },
                1,
            )
        }
        (_, DispTier::Split) => {
            // lis shifts the high half into place; ori fills the low 16 bits
            // unsigned, so no rounding compensation is needed.
            let lo = (disp.0 & 0xFFFF) as u16;
            let hi = ((disp.0 as u32) >> 16) as u16;
            buf.push(word::lis(SCRATCH_GPR[0], hi as i16));
            buf.push(word::ori(SCRATCH_GPR[0], SCRATCH_GPR[0], lo));
            (
                AddrFields::Indexed {
                    ra: mem.base.phys(),
                    rb: SCRATCH_GPR[0],
                },
                2,
            )
        }
    }
}
