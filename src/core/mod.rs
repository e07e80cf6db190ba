// This module serves as the central hub for RVE's target-independent infrastructure,
// providing the building blocks every architecture-family backend shares: the portable
// operand namespace and memory-operand model, the build-time target configuration with
// its feature bits, the owned code buffer with label fixups, the arena-backed encoding
// session with emission statistics, the error taxonomy, and the TargetBackend trait that
// backends implement. Nothing here encodes instructions; the concrete bit layouts live
// in the per-family modules. All components are designed around the zero-runtime-overhead
// goal: configuration is validated once at backend construction, emission is infallible
// appending, and operand contracts are caller preconditions rather than runtime checks.

//! Target-independent core: operands, configuration, buffer, session, errors.

pub mod backend;
pub mod buffer;
pub mod config;
pub mod error;
pub mod operand;
pub mod session;

pub use backend::{ArithOp, Cond, LogicOp, TargetBackend};
pub use buffer::{BranchForm, CodeBuffer, Label};
pub use config::{
    OpFamily, RoundMode, Strategy, TargetConfig, VectorWidth, FEAT_NATIVE_FMA,
    FEAT_NATIVE_RECIP, FEAT_NATIVE_ROUND, FEAT_NATIVE_RSQRT, FEAT_SCALAR_SLOTS, FEAT_W128,
    FEAT_W256, FEAT_W512,
};
pub use error::{EncodeError, EncodeResult};
pub use operand::{AddrRole, AddressMode, Disp, Gpr, MemOperand, PhysReg, Vr};
pub use session::{EmitStats, EncodingSession};
