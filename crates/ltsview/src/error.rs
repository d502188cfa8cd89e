use thiserror::Error;

use crate::ClusterIndex;
use crate::RankStyle;

/// The precondition violations of the layout pipeline. Every operation checks
/// its preconditions before it modifies the view, so after an error the view
/// is unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    #[error("The initial state {0} is not one of the {1} states")]
    InvalidInitialState(usize, usize),

    #[error("The states must be ranked first")]
    NotRanked,

    #[error("The states were ranked with the {ranked:?} style, but {requested:?} was requested")]
    RankStyleMismatch { ranked: RankStyle, requested: RankStyle },

    #[error("The states must be clustered first")]
    NotClustered,

    #[error("The clusters must be positioned first")]
    NotSized,

    #[error("The states must be positioned first")]
    NotPositioned,

    #[error("Cluster {0} does not exist")]
    InvalidCluster(ClusterIndex),
}
