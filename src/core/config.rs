// This module defines the build-time configuration surface of the encoding engine. A
// TargetConfig is an explicit, passed-in object (one per backend instance, so multiple
// target configurations can coexist in one process) that fixes the logical vector width
// and the emission strategy of every hardware-optional operation family for the lifetime
// of the configuration. Strategies are never re-evaluated per call. The module also owns
// the feature-bit constants the runtime feature query reports: callers inspect the
// returned bitfield before trusting capability-specific generated code, because executing
// such code on hardware lacking the capability is an illegal-instruction failure, not a
// recoverable error. Validation of a config against a concrete family's abilities happens
// once, at backend construction.

//! Build-time target configuration and feature bits.

use super::operand::Gpr;

/// Logical vector width of the portable register file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorWidth {
    W128,
    W256,
    W512,
}

impl VectorWidth {
    pub const fn bits(self) -> u32 {
        match self {
            VectorWidth::W128 => 128,
            VectorWidth::W256 => 256,
            VectorWidth::W512 => 512,
        }
    }

    /// Number of native-width repetitions one logical operation expands to.
    pub const fn halves(self) -> usize {
        match self {
            VectorWidth::W128 => 1,
            VectorWidth::W256 => 2,
            VectorWidth::W512 => 4,
        }
    }

    pub const fn bytes(self) -> usize {
        (self.bits() / 8) as usize
    }

    /// Number of f32 lanes at this logical width.
    pub const fn lanes(self) -> usize {
        (self.bits() / 32) as usize
    }
}

/// Emission strategy for a hardware-optional operation family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// A single native instruction per native-width repetition.
    Native,
    /// Low-precision native estimate refined by Newton correction steps.
    Refine,
    /// Lane-by-lane round trip through scalar hardware and scratch memory.
    ScalarFallback,
}

/// Operation families with configurable emission strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum OpFamily {
    Div = 0,
    Sqrt = 1,
    Recip = 2,
    Rsqrt = 3,
    Fma = 4,
    Fms = 5,
    Round = 6,
}

impl OpFamily {
    pub const COUNT: usize = 7;

    pub const ALL: [OpFamily; Self::COUNT] = [
        OpFamily::Div,
        OpFamily::Sqrt,
        OpFamily::Recip,
        OpFamily::Rsqrt,
        OpFamily::Fma,
        OpFamily::Fms,
        OpFamily::Round,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Directed rounding mode for the Round family.
///
/// Note: for Fms under the scalar fallback the final negation happens outside
/// the rounding step, so only Nearest and TowardZero are consistent across
/// all strategies for that family (see `ppc::emulation`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundMode {
    Nearest,
    TowardZero,
    TowardPosInf,
    TowardNegInf,
}

// Feature bits reported by the runtime feature query.
pub const FEAT_W128: u32 = 1 << 0;
pub const FEAT_W256: u32 = 1 << 1;
pub const FEAT_W512: u32 = 1 << 2;
pub const FEAT_NATIVE_RECIP: u32 = 1 << 3;
pub const FEAT_NATIVE_RSQRT: u32 = 1 << 4;
pub const FEAT_NATIVE_FMA: u32 = 1 << 5;
pub const FEAT_NATIVE_ROUND: u32 = 1 << 6;
pub const FEAT_SCALAR_SLOTS: u32 = 1 << 7;

/// Build-time configuration for one backend instance.
///
/// Fixed for the lifetime of a compiled configuration; the strategy table is
/// selected here once and never per call.
#[derive(Debug, Clone)]
pub struct TargetConfig {
    /// Logical width of every portable vector name.
    pub width: VectorWidth,
    /// Emission strategy per operation family.
    strategies: [Strategy; OpFamily::COUNT],
    /// Portable register holding the caller-reserved scratch memory block
    /// used by scalar-fallback paths. Caller-owned; one block per thread.
    pub scratch_base: Gpr,
}

impl TargetConfig {
    /// New configuration at the given width with every family Native.
    pub fn new(width: VectorWidth) -> Self {
        Self {
            width,
            strategies: [Strategy::Native; OpFamily::COUNT],
            scratch_base: Gpr::G9,
        }
    }

    /// Set the strategy for one operation family.
    pub fn with_strategy(mut self, family: OpFamily, strategy: Strategy) -> Self {
        self.strategies[family.index()] = strategy;
        self
    }

    /// Set every family to the same strategy.
    pub fn with_all_strategies(mut self, strategy: Strategy) -> Self {
        self.strategies = [strategy; OpFamily::COUNT];
        self
    }

    pub fn with_scratch_base(mut self, base: Gpr) -> Self {
        self.scratch_base = base;
        self
    }

    /// Strategy selected for an operation family.
    pub fn strategy(&self, family: OpFamily) -> Strategy {
        self.strategies[family.index()]
    }

    /// Whether any family routes through the scalar fallback, which widens
    /// the save/restore layout by two scalar transfer slots.
    pub fn any_scalar_fallback(&self) -> bool {
        self.strategies.iter().any(|s| *s == Strategy::ScalarFallback)
    }

    /// Feature bit for the configured width family.
    pub const fn width_feature(&self) -> u32 {
        match self.width {
            VectorWidth::W128 => FEAT_W128,
            VectorWidth::W256 => FEAT_W256,
            VectorWidth::W512 => FEAT_W512,
        }
    }
}
