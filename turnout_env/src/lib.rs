//! Turnout Environment Layer
//!
//! Every source of non-determinism used by the simulator is routed through
//! this crate so that a whole calibration run can be replayed from a single
//! 64-bit seed.
//!
//! - **Randomness**: [`SimContext`] derives independent ChaCha8 streams for
//!   each subsystem (population, decisions, annealing chains).
//! - **Cancellation**: [`CancelToken`] is checked by long-running step loops
//!   between steps.
//!
//! # Example
//!
//! ```ignore
//! use turnout_env::{SimContext, StreamId};
//!
//! let ctx = SimContext::new(42);
//! let mut population_rng = ctx.stream(StreamId::Population);
//! let mut chain_rng = ctx.stream(StreamId::Chain(3));
//! ```

mod cancel;
mod context;
mod error;

pub use cancel::CancelToken;
pub use context::{SimContext, StreamId};
pub use error::EnvError;
