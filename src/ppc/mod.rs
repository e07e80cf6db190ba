// This module is the POWER-style architecture-family backend. The layer split mirrors
// the hardware's format families: word.rs composes 32-bit instruction words, resolver.rs
// tiers displacements into the smallest representable addressing form, width.rs expands
// logical vector names over adjacent physical register groups, control.rs owns the branch
// and mask-reduction conventions around the condition register, emulation.rs provides the
// Native/Refine/ScalarFallback paths for the hardware-optional operation families, and
// regs.rs fixes the scratch reservations and the save/restore layout. backend.rs ties the
// layers into the TargetBackend implementation and is the only validation point.

//! POWER-style family backend: word layouts, addressing tiers, emulation.

pub mod backend;
pub mod control;
pub mod emulation;
pub mod regs;
pub mod resolver;
pub mod width;
pub mod word;

pub use backend::PpcBackend;
pub use emulation::SCRATCH_MEM_SIZE;
pub use regs::SaveLayout;
pub use resolver::{classify, AddrFields, DispTier, MemClass};
