#![forbid(unsafe_code)]

//! Gold-file primitives for the svmgold regression harness.
//!
//! - [`signature`]: stable signature hashing
//! - [`layout`]: gold keys, path resolution and layout detection
//! - [`store`]: reading gold values and writing candidates
//! - [`corpus`]: scanning, candidate listing and layout migration

pub mod corpus;
pub mod descriptor;
pub mod error;
pub mod layout;
pub mod mode;
pub mod signature;
pub mod store;

pub use descriptor::MethodDescriptor;
pub use error::{GoldError, Result};
pub use layout::{GoldKey, GoldLayout, GoldLocation, GoldLocator};
pub use mode::{ExplorationMode, OsFamily};
pub use signature::{HashSeed, SignatureHash, signature_hash};
pub use store::{CandidatePolicy, GoldEntry, GoldStore};
