//! Frame correspondence: which frames of both videos belong to an anchor.

use contracts::{ContractError, StreamKind};

use crate::timestamp_index::TimestampIndex;

/// Frames taken from the secondary stream per anchor
pub const SECONDARY_NEIGHBORS: usize = 3;

/// Frames of both videos shown for one anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Correspondence {
    /// `[i - 1, i, i + 1]`
    pub primary: [usize; 3],
    /// The 3 secondary frames nearest the anchor, in temporal order
    pub secondary: [usize; 3],
}

/// Selects corresponding frames from the two video timelines
#[derive(Debug, Clone)]
pub struct FrameCorrespondence {
    primary: TimestampIndex,
    secondary: TimestampIndex,
}

impl FrameCorrespondence {
    /// Fails with `InsufficientNeighbors` if the secondary stream is shorter
    /// than [`SECONDARY_NEIGHBORS`]
    pub fn new(primary: TimestampIndex, secondary: TimestampIndex) -> Result<Self, ContractError> {
        if secondary.len() < SECONDARY_NEIGHBORS {
            return Err(ContractError::InsufficientNeighbors {
                stream: StreamKind::SecondaryVideo,
                available: secondary.len(),
                required: SECONDARY_NEIGHBORS,
            });
        }
        Ok(Self { primary, secondary })
    }

    pub fn primary(&self) -> &TimestampIndex {
        &self.primary
    }

    pub fn secondary(&self) -> &TimestampIndex {
        &self.secondary
    }

    /// Correspondence for primary index `anchor`, `1 <= anchor <= len - 2`
    pub fn for_anchor(&self, anchor: usize) -> Result<Correspondence, ContractError> {
        let len = self.primary.len();
        let anchor_ts = match self.primary.get(anchor) {
            Some(ts) if anchor >= 1 && anchor + 1 < len => ts,
            _ => {
                return Err(ContractError::AnchorOutOfRange {
                    stream: StreamKind::PrimaryVideo,
                    index: anchor,
                    len,
                })
            }
        };

        let nearest = self.secondary.nearest_indices(anchor_ts, SECONDARY_NEIGHBORS);
        let ordered = self.secondary.sort_by_timestamp(&nearest);
        let secondary: [usize; 3] =
            ordered
                .try_into()
                .map_err(|got: Vec<usize>| ContractError::InsufficientNeighbors {
                    stream: StreamKind::SecondaryVideo,
                    available: got.len(),
                    required: SECONDARY_NEIGHBORS,
                })?;

        Ok(Correspondence {
            primary: [anchor - 1, anchor, anchor + 1],
            secondary,
        })
    }
}
