//! RVE - Retargetable Vector Encoder.
//!
//! RVE is a low-level instruction-encoding engine for fixed-width RISC vector
//! targets. Callers state abstract operations against a portable register
//! namespace; the selected backend resolves addressing tiers, expands logical
//! vector widths over adjacent physical registers, routes hardware-optional
//! operation families through configured emulation strategies, and appends
//! final 32-bit instruction words to an owned buffer.
//!
//! # Primary Usage
//!
//! ```ignore
//! use rve::core::{ArithOp, CodeBuffer, OpFamily, Strategy, TargetBackend, TargetConfig,
//!                 VectorWidth, Vr};
//! use rve::ppc::PpcBackend;
//!
//! // Fix width and per-family strategies once, validate at construction.
//! let config = TargetConfig::new(VectorWidth::W256)
//!     .with_strategy(OpFamily::Div, Strategy::Refine)
//!     .with_strategy(OpFamily::Sqrt, Strategy::Refine);
//! let backend = PpcBackend::new(config)?;
//!
//! // Emit against the portable namespace; finalize patches branch fixups.
//! let mut buf = CodeBuffer::new();
//! backend.emit_arith(&mut buf, ArithOp::Add, Vr::V2, Vr::V0, Vr::V1);
//! backend.emit_div(&mut buf, Vr::V3, Vr::V2, Vr::V1);
//! let words = buf.finalize()?;
//! ```
//!
//! # Architecture
//!
//! - [`core`] - Target-independent infrastructure (operands, config, buffer,
//!   session, errors, the `TargetBackend` trait)
//! - [`ppc`] - POWER-style family backend (word layouts, addressing tiers,
//!   capability emulation, save/restore layout)

pub mod core;
pub mod ppc;

// Re-export the common surface so callers rarely need the module paths.
pub use crate::core::{
    // Portable operand namespace
    AddressMode, Disp, Gpr, MemOperand, Vr,
    // Configuration and feature bits
    OpFamily, RoundMode, Strategy, TargetConfig, VectorWidth,
    // Emission
    ArithOp, CodeBuffer, Cond, Label, LogicOp, TargetBackend,
    // Session and errors
    EmitStats, EncodeError, EncodeResult, EncodingSession,
};
pub use crate::ppc::PpcBackend;
