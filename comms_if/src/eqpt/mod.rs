//! # Equipment Interface
//!
//! This module defines the interface structures which are exchanged with equipment and remote
//! producers.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod det;
pub mod mech;
pub mod sens;
