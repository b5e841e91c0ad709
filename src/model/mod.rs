//! Hook model
//!
//! Typed hooks, filters, events and release targets read from the frozen
//! configuration projection.

mod event;
mod filter;
mod hook;
mod target;

pub use event::{ExecutionEvent, Outcome, Phase};
pub use filter::{Filter, FilterDecision, FilterError};
pub use hook::{Active, Hook, HookSet, ModelError, RunKind};
pub use target::{targets, Target};
