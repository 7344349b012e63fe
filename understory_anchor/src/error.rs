// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error type and result alias.

use alloc::string::String;

use thiserror::Error;

/// Convenient result type used throughout this crate.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors produced by this crate.
///
/// Configuration problems are reported at setup time. Measurement failures
/// ([`Error::Detached`]) are returned by [`compute_position`](crate::compute_position)
/// but never escape an auto-update subscription.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A virtual reference has neither a bounding-rect nor a client-rects accessor.
    #[error("virtual element has no rect accessor")]
    MissingRectAccessor,
    /// A boundary listed no elements.
    #[error("boundary element list is empty")]
    EmptyBoundary,
    /// A literal boundary or root-boundary rectangle is not finite.
    #[error("boundary rectangle is not finite")]
    InvalidBoundaryRect,
    /// A configured element handle is unknown to the platform.
    #[error("element is not known to the platform")]
    UnknownElement,
    /// A placement string could not be parsed.
    #[error("invalid placement: {0}")]
    InvalidPlacement(String),
    /// A strategy string could not be parsed.
    #[error("invalid strategy: {0}")]
    InvalidStrategy(String),
    /// The reference or floating element could not be measured.
    #[error("reference or floating element is disconnected")]
    Detached,
}
