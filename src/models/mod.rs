//! # Models
//!
//! Model components for dose-challenge survival experiments: the additive
//! hazard kernel, the two dose-response families, and the full survival
//! target distribution with its posterior summarization workflow.

pub mod hazard;
pub mod response;
pub mod survival;
