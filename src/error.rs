use thiserror::Error;

/// Failures of a single (team, half) alignment pass.
///
/// Every variant is fatal for the unit that raised it; the batch driver
/// decides whether to abort the match or skip the unit.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AlignError {
    #[error("Ball track has {ball_frames} frames but does not cover its {span}-frame span (max - min + 1) exactly once")]
    ClockMismatch { ball_frames: usize, span: i64 },

    #[error("Ball track is empty; no frame clock can be derived")]
    EmptyClock,

    #[error("Role '{role}' of entity {entity_id} is not ranked by scheme {scheme}")]
    RoleLookupFailure {
        entity_id: String,
        role: String,
        scheme: String,
    },

    #[error("Row {row} (frame {frame}) has {found} valid entries, expected {expected}")]
    InsufficientEntries {
        row: usize,
        frame: i64,
        found: usize,
        expected: usize,
    },

    #[error("Row {row} (frame {frame}) has {found} valid entries (expected {expected}) and no signal to choose which to keep")]
    UnresolvableOverlap {
        row: usize,
        frame: i64,
        found: usize,
        expected: usize,
    },

    #[error("Target of {target} entries is not a whole number of {dims}-cell entity slots")]
    MisalignedTarget { target: usize, dims: usize },

    #[error("Row {row} has {found} valid entries but the condensed width is {expected}; was overlap resolution skipped?")]
    ColumnCountDisagreement {
        row: usize,
        expected: usize,
        found: usize,
    },
}
