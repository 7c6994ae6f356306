//! # Communications interface crate.
//!
//! Provides all common communications interfaces for the software.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Detection, sensing and actuation definitions for equipment
pub mod eqpt;

/// Network module
pub mod net;
