//! Core types for retain.

mod attempt;
mod message;
mod problem;
mod schedule;

pub use attempt::*;
pub use message::*;
pub use problem::*;
pub use schedule::*;
