//! Step handlers by kind
//!
//! Each submodule contains the execution logic for one step type.

pub mod condition;
pub mod output;
pub mod prompt;
pub mod tool;
pub mod transform;
