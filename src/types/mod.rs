//! Core types for convoy.

pub mod decision;
pub mod envelope;
pub mod message;

pub use decision::*;
pub use envelope::*;
pub use message::*;
