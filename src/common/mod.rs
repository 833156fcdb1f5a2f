//! Common types, traits, and error definitions for rrt_navigation
//!
//! This module provides the foundational building blocks shared by the
//! planner, sensor, controller and mission loop.

pub mod types;
pub mod traits;
pub mod error;

pub use types::*;
pub use traits::*;
pub use error::*;
