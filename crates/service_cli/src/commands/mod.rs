//! CLI command implementations
//!
//! Each submodule implements one subcommand; [`pipeline`] holds the stages
//! they share.

pub mod calibrate;
pub mod check;
pub mod compare;
pub mod pipeline;
pub mod price;
