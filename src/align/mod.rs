//! Ragged-to-dense alignment engine.
//!
//! Data flow for one (team, half):
//! role sort → expand → resolve overlaps → condense.

pub mod condense;
pub mod expand;
pub mod matrix;
pub mod overlap;
pub mod ranking;
pub mod stitch;

pub use matrix::{FrameMatrix, Missing};
pub use overlap::OverlapStrategy;
pub use ranking::RankingRegistry;
pub use stitch::{align_match, AlignConfig, AlignedHalf};
