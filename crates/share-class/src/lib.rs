//! # fundline-share-class
//!
//! Share class registry: metadata with unique salts, the latest validated
//! price per share, and cumulative issuance/revocation counters per network.
//! Total issuance is the sum of per-network net supply over the networks the
//! class has been active on.

#![deny(unsafe_code)]

pub mod error;
pub mod registry;
pub mod share_class;

pub use error::{Result, ShareClassError};
pub use registry::ShareClassRegistry;
pub use share_class::{
    NetworkIssuance, PricePoint, Salt, ShareClass, MAX_NAME_LEN, MAX_SYMBOL_LEN,
};
