//! Crate-wide defaults for the spatializer core.

/// Default per-callback block size, in frames. Power of two; held constant for the
/// lifetime of a `RendererState`.
pub const DEFAULT_BLOCK_SIZE: usize = 512;

/// Maximum number of virtual speakers a single `Renderer` may hold (7.1.4 plus headroom).
pub const MAX_VIRTUAL_SPEAKERS: usize = 16;

/// dB-per-dB-of-asymmetry factor used when deriving ILD compensation gains.
pub const ILD_COMPENSATION_FACTOR: f64 = 0.9;

/// Maximum per-channel multiplier contributed by manual balance trim.
pub const MANUAL_BALANCE_MAX_TRIM: f32 = 0.15;
