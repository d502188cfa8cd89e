//!
//! This crate contains the compact representation of labelled transition
//! systems that is shared by the IO and visualisation crates.
//!

#![forbid(unsafe_code)]

mod labelled_transition_system;
mod random_lts;

pub use labelled_transition_system::*;
pub use random_lts::*;
