//! Core types for Entrega.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod card_number;
pub mod email;
pub mod gps;
pub mod id;
pub mod visited;

pub use card_number::CardNumber;
pub use email::{Email, EmailError};
pub use gps::{GpsCoord, GpsError};
pub use id::*;
pub use visited::{Visited, VisitedError};
