// This module defines error types for the RVE encoding engine using the thiserror crate
// for idiomatic Rust error handling. EncodeError covers the build-configuration taxonomy
// only: a vector width the selected target family cannot compose, a capability strategy
// the family has no emission path for, labels that were never bound before finalize, and
// branch displacements that overflow their instruction form. Operand-contract violations
// (scratch-register collisions, wrong addressing-mode tags) are documented preconditions
// of the encoding tables and are deliberately not represented here; the engine has no
// in-band runtime error channel beyond configuration and finalize time. The module also
// provides EncodeResult<T> as a convenience alias.

//! Error types for the encoding engine.
//!
//! Using thiserror for more idiomatic error handling.

use thiserror::Error;

use super::buffer::Label;
use super::config::{OpFamily, Strategy};

/// Main error type for encoding configuration and finalization.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("unsupported {width}-bit vector width for the {family} target family")]
    UnsupportedWidth { family: &'static str, width: u32 },

    #[error("strategy {strategy:?} has no emission path for operation family {family:?}")]
    UnsupportedStrategy { family: OpFamily, strategy: Strategy },

    #[error("label {0:?} was never bound before finalize")]
    UnboundLabel(Label),

    #[error("branch displacement {disp} bytes out of range for {form} encoding")]
    BranchOutOfRange { form: &'static str, disp: i64 },
}

/// Result type alias for encoding operations.
pub type EncodeResult<T> = Result<T, EncodeError>;
