//! permission resolution for coffer.
//!
//! this crate answers one question: may this user perform this action on
//! this resource? access uses deny-by-default semantics with union
//! composition: every direct, group and vault-containment assignment is a
//! candidate, and any candidate whose level is on the action's whitelist
//! allows the action.

#![warn(missing_docs)]

pub mod engine;
pub mod error;

pub use coffer_types::Action;
pub use engine::{AccessResolver, AssignmentSource, Candidate, Via};
pub use error::{Error, Result};
