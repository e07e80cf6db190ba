// This module is the width-composition layer: it expands one logical wide-vector
// operation into repeated native 128-bit emissions over paired registers. The pairing
// offset is +1 for the second half of a 256-bit composite; a 512-bit operation composes
// the 256-bit composite and then pairs that composite again at +2, rather than expanding
// four raw repetitions, which keeps the pairing-offset invariant uniform at every level.
// The same offset is applied to every vector operand of one repetition. Composition is
// pure: no state is carried between invocations, so repeated expansion of the same
// logical operation yields the identical offset pattern. A partially-written composite
// leaves its unwritten halves unchanged on this family (architecture-defined; other
// families zero them); callers must not rely on that state across mixed-width code.

//! Wide-vector composition over paired registers.

use crate::core::config::VectorWidth;
use crate::core::operand::{PhysReg, Vr};

/// Physical vector register of one native-width half of a portable name.
pub const fn phys_half(vr: Vr, half: usize) -> PhysReg {
    vr.phys_base() + half as PhysReg
}

/// Invoke `f` once per native-width repetition, passing the half offset.
///
/// The recursion mirrors the composition rule: a 512-bit operation is the
/// 256-bit composite followed by the same composite shifted by the
/// second-level pairing offset.
pub fn for_each_half<F: FnMut(usize)>(width: VectorWidth, mut f: F) {
    compose(width, 0, &mut f);
}

fn compose<F: FnMut(usize)>(width: VectorWidth, base: usize, f: &mut F) {
    match width {
        VectorWidth::W128 => f(base),
        VectorWidth::W256 => {
            compose(VectorWidth::W128, base, f);
            compose(VectorWidth::W128, base + 1, f);
        }
        VectorWidth::W512 => {
            compose(VectorWidth::W256, base, f);
            compose(VectorWidth::W256, base + 2, f);
        }
    }
}

/// Collected half offsets for a width, low half first.
pub fn half_offsets(width: VectorWidth) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(width.halves());
    for_each_half(width, |h| offsets.push(h));
    offsets
}
