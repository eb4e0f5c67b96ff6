//! Command line interface.

pub mod propagate;
pub mod run;
