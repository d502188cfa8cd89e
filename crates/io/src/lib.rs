//!
//! A crate containing IO related functionality. This includes the reading and
//! writing of the .aut (Aldebaran) lts format.
//!

#![forbid(unsafe_code)]

mod line_iterator;

pub mod io_aut;
