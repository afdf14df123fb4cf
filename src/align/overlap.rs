//! Overlap resolution.
//!
//! Substitutions briefly leave both the outgoing and the incoming player on
//! the tracking feed, so an expanded row can hold more entity slots than the
//! roster allows. Resolution trims every such row back to the roster width.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::matrix::SparseFrames;
use crate::error::AlignError;

/// How to choose the slots kept in an over-occupied row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverlapStrategy {
    /// Keep slots that were kept in the previous row, then the lowest-index
    /// newcomers. Refuses to guess on a first row.
    Continuity,
    /// Keep slots that stay valid longest over the next `window` rows; ties
    /// go to the previous row's slots, then to the lowest index.
    Lookahead { window: usize },
}

impl OverlapStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            OverlapStrategy::Continuity => "continuity",
            OverlapStrategy::Lookahead { .. } => "lookahead",
        }
    }
}

/// Return a copy of `sparse` in which every row holds exactly `target` valid
/// entries. `target` is counted in cells and must be a multiple of
/// `sparse.dims`.
///
/// Slots that are only partially valid, or that lose the selection, are
/// blanked whole. The input is left untouched.
pub fn resolve_overlaps(
    sparse: &SparseFrames,
    target: usize,
    strategy: OverlapStrategy,
) -> Result<SparseFrames, AlignError> {
    let mut out = sparse.clone();
    if sparse.dims == 0 {
        return Ok(out);
    }
    let dims = sparse.dims;
    if target % dims != 0 {
        return Err(AlignError::MisalignedTarget { target, dims });
    }
    let target_slots = target / dims;
    let missing = sparse.missing.value();
    let mut prev: Option<Vec<bool>> = None;
    let mut resolved_rows = 0usize;

    for row in 0..sparse.rows() {
        let valid = sparse.valid_slots(row);
        let found = valid.len() * dims;

        if valid.len() < target_slots {
            return Err(AlignError::InsufficientEntries {
                row,
                frame: sparse.frame(row),
                found,
                expected: target,
            });
        }

        let keep = if valid.len() == target_slots {
            valid
        } else {
            let chosen = match strategy {
                OverlapStrategy::Continuity => by_continuity(&valid, prev.as_deref(), target_slots),
                OverlapStrategy::Lookahead { window } => {
                    by_lookahead(sparse, row, &valid, prev.as_deref(), target_slots, window)
                }
            };
            let keep = chosen.ok_or(AlignError::UnresolvableOverlap {
                row,
                frame: sparse.frame(row),
                found,
                expected: target,
            })?;
            debug!(
                "Resolved overlap at row {} (frame {}): kept slots {:?} of {:?}",
                row,
                sparse.frame(row),
                keep,
                valid
            );
            resolved_rows += 1;
            keep
        };

        let mut kept = vec![false; sparse.slots()];
        for slot in &keep {
            kept[*slot] = true;
        }
        let cells = out.matrix.row_mut(row);
        for (slot, is_kept) in kept.iter().enumerate() {
            if !is_kept {
                cells[slot * dims..(slot + 1) * dims].fill(missing);
            }
        }
        prev = Some(kept);
    }

    if resolved_rows > 0 {
        debug!(
            "Overlap resolution ({}) trimmed {} of {} rows",
            strategy.name(),
            resolved_rows,
            sparse.rows()
        );
    }
    Ok(out)
}

fn by_continuity(valid: &[usize], prev: Option<&[bool]>, target: usize) -> Option<Vec<usize>> {
    let prev = prev?;
    let (mut keep, newcomers): (Vec<usize>, Vec<usize>) =
        valid.iter().copied().partition(|slot| prev[*slot]);
    // the previous row held exactly `target` slots, so this never drops incumbents
    keep.truncate(target);
    let need = target - keep.len();
    keep.extend(newcomers.into_iter().take(need));
    keep.sort_unstable();
    Some(keep)
}

fn by_lookahead(
    sparse: &SparseFrames,
    row: usize,
    valid: &[usize],
    prev: Option<&[bool]>,
    target: usize,
    window: usize,
) -> Option<Vec<usize>> {
    if target == 0 {
        return Some(Vec::new());
    }
    let horizon = (row + window).min(sparse.rows());
    let persistence = |slot: usize| {
        (row..horizon)
            .take_while(|r| sparse.slot_valid(*r, slot))
            .count()
    };

    // (persistence, was kept in previous row, slot)
    let mut ranked: Vec<(usize, bool, usize)> = valid
        .iter()
        .map(|&slot| (persistence(slot), prev.map_or(false, |p| p[slot]), slot))
        .collect();
    ranked.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.cmp(&a.1)).then(a.2.cmp(&b.2)));

    if prev.is_none() && ranked[target - 1].0 == ranked[target].0 {
        return None;
    }
    let mut keep: Vec<usize> = ranked[..target].iter().map(|r| r.2).collect();
    keep.sort_unstable();
    Some(keep)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::matrix::{FrameMatrix, Missing};

    const M: f64 = -8192.0;

    fn sparse(rows: &[Vec<f64>], dims: usize) -> SparseFrames {
        SparseFrames {
            matrix: FrameMatrix::from_rows(rows).unwrap(),
            dims,
            first_frame: 1000,
            missing: Missing::new(M),
        }
    }

    #[test]
    fn continuity_keeps_incumbent_during_transient_overlap() {
        // X valid rows 0-2, Y only at row 2
        let input = sparse(&[vec![1.0, M], vec![1.0, M], vec![1.0, 9.0]], 1);
        let out = resolve_overlaps(&input, 1, OverlapStrategy::Continuity).unwrap();
        assert_eq!(out.matrix.row(2), &[1.0, M]);
        // the input is not modified
        assert_eq!(input.matrix.row(2), &[1.0, 9.0]);
    }

    #[test]
    fn continuity_hands_over_after_substitution() {
        // X leaves after row 2, Y arrives at row 1
        let input = sparse(
            &[vec![1.0, M], vec![1.0, 9.0], vec![1.0, 9.0], vec![M, 9.0]],
            1,
        );
        let out = resolve_overlaps(&input, 1, OverlapStrategy::Continuity).unwrap();
        assert_eq!(out.matrix.row(1), &[1.0, M]);
        assert_eq!(out.matrix.row(2), &[1.0, M]);
        assert_eq!(out.matrix.row(3), &[M, 9.0]);
    }

    #[test]
    fn newcomers_fill_leftmost_first() {
        // incumbent slot 0 vanishes while slots 1 and 2 both appear; target 2
        let input = sparse(
            &[vec![1.0, M, M, 4.0], vec![M, 2.0, 3.0, 4.0]],
            1,
        );
        let out = resolve_overlaps(&input, 2, OverlapStrategy::Continuity).unwrap();
        assert_eq!(out.matrix.row(1), &[M, 2.0, M, 4.0]);
    }

    #[test]
    fn first_row_overlap_is_unresolvable() {
        let input = sparse(&[vec![1.0, 2.0], vec![1.0, M]], 1);
        let err = resolve_overlaps(&input, 1, OverlapStrategy::Continuity).unwrap_err();
        assert_eq!(
            err,
            AlignError::UnresolvableOverlap {
                row: 0,
                frame: 1000,
                found: 2,
                expected: 1
            }
        );
    }

    #[test]
    fn shortage_is_reported_with_row() {
        let input = sparse(&[vec![1.0, 2.0], vec![1.0, M]], 1);
        let err = resolve_overlaps(&input, 2, OverlapStrategy::Continuity).unwrap_err();
        assert_eq!(
            err,
            AlignError::InsufficientEntries {
                row: 1,
                frame: 1001,
                found: 1,
                expected: 2
            }
        );
    }

    #[test]
    fn target_must_cover_whole_slots() {
        let input = sparse(
            &[vec![1.0, 1.0, M, M], vec![1.0, 1.0, M, M]],
            2,
        );
        let err = resolve_overlaps(&input, 3, OverlapStrategy::Continuity).unwrap_err();
        assert_eq!(err, AlignError::MisalignedTarget { target: 3, dims: 2 });
        // the aligned target is met exactly
        let out = resolve_overlaps(&input, 2, OverlapStrategy::Continuity).unwrap();
        assert!((0..2).all(|r| out.valid_count(r) == 2));
    }

    #[test]
    fn slots_are_dropped_as_whole_blocks() {
        let input = sparse(
            &[
                vec![1.0, 1.0, M, M, 3.0, 3.0],
                vec![1.0, 1.0, 2.0, 2.0, 3.0, 3.0],
                // half-valid slot 1 counts as missing
                vec![1.0, 1.0, 2.0, M, 3.0, 3.0],
            ],
            2,
        );
        let out = resolve_overlaps(&input, 4, OverlapStrategy::Continuity).unwrap();
        assert_eq!(out.matrix.row(1), &[1.0, 1.0, M, M, 3.0, 3.0]);
        assert_eq!(out.matrix.row(2), &[1.0, 1.0, M, M, 3.0, 3.0]);
        assert!((0..3).all(|r| out.valid_count(r) == 4));
    }

    #[test]
    fn lookahead_prefers_longest_persistence() {
        // slot 0 disappears after row 1, slot 1 persists
        let input = sparse(
            &[vec![1.0, M], vec![1.0, 2.0], vec![M, 2.0], vec![M, 2.0]],
            1,
        );
        let out =
            resolve_overlaps(&input, 1, OverlapStrategy::Lookahead { window: 3 }).unwrap();
        assert_eq!(out.matrix.row(1), &[M, 2.0]);
    }

    #[test]
    fn lookahead_resolves_first_row_when_scores_separate() {
        let input = sparse(&[vec![1.0, 2.0], vec![M, 2.0]], 1);
        let out =
            resolve_overlaps(&input, 1, OverlapStrategy::Lookahead { window: 5 }).unwrap();
        assert_eq!(out.matrix.row(0), &[M, 2.0]);
    }

    #[test]
    fn lookahead_refuses_tied_first_row() {
        let input = sparse(&[vec![1.0, 2.0], vec![1.0, 2.0]], 1);
        let err =
            resolve_overlaps(&input, 1, OverlapStrategy::Lookahead { window: 5 }).unwrap_err();
        assert!(matches!(err, AlignError::UnresolvableOverlap { row: 0, .. }));
    }

    #[test]
    fn lookahead_ties_fall_back_to_continuity() {
        let input = sparse(&[vec![M, 2.0], vec![1.0, 2.0], vec![1.0, 2.0]], 1);
        let out =
            resolve_overlaps(&input, 1, OverlapStrategy::Lookahead { window: 2 }).unwrap();
        assert_eq!(out.matrix.row(1), &[M, 2.0]);
        assert_eq!(out.matrix.row(2), &[M, 2.0]);
    }
}
