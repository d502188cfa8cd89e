//!
//! This crate computes the three dimensional layout of a labelled transition
//! system as a tree of clusters. The states are ranked by their distance from
//! the initial state, the states of a rank are grouped into clusters that form
//! a tree, and the clusters and the states within them are positioned.
//!
//! This crate does not use unsafe code.

#![forbid(unsafe_code)]

mod cluster;
mod cluster_sizing;
mod clustering;
mod config;
mod error;
mod force_directed;
mod geometry;
mod lts_view;
mod ranking;
mod ring;
mod rtree;
mod state;
mod state_positioner;
mod zoom;

pub use cluster::*;
pub use cluster_sizing::CLUSTER_HEIGHT;
pub use config::*;
pub use error::*;
pub use force_directed::*;
pub use lts_view::LtsView;
pub use ring::*;
pub use rtree::*;
pub use state::*;
