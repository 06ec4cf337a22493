//! Centralized error type for the vessel umbrella crate.
//!
//! Wraps subsystem errors so `?` propagates naturally across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Bridge(#[from] vessel_bridge::BridgeError),
}

pub type Result<T> = std::result::Result<T, Error>;
