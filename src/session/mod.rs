//! Session module - event model, projection and control surface
//!
//! The engine emits [`SessionEvent`]s; a [`NegotiationSession`] owns one
//! negotiation and folds those events into a [`SessionState`].

pub mod controller;
pub mod events;
pub mod state;

pub use controller::NegotiationSession;
pub use events::{FailureReason, SessionEvent};
pub use state::{reduce, SessionState, SessionStatus};
