//! Configuration types
//!
//! Every tunable of the controller lives here with a documented default.
//! With the `serde` feature the whole set can be stored as postcard bytes.

pub mod types;

pub use types::*;
