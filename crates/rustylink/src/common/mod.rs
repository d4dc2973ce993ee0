//! Execution primitives shared by the stack layers
//!
//! Everything in the L2CAP core runs as tasks on a [`Handler`]; timers are
//! [`Alarm`]s that post back onto the same handler.

pub mod alarm;
pub mod handler;

pub use alarm::Alarm;
pub use handler::{Handler, Task};
