//! Deterministic simulation harness for Driftbox testing.
//!
//! Provides [`SimEnv`], an [`Environment`] with a virtual wall clock and a
//! seeded RNG, so store lifecycles spanning hours run instantly and
//! reproducibly.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod sim_env;

pub use sim_env::SimEnv;

#[doc(no_inline)]
pub use driftbox_core::env::Environment;
