//! Variable-length epoch bookkeeping.
//!
//! Epochs are contiguous block spans starting at a configured origin. Their
//! length is described by an append-only history of
//! `(effective_from_epoch, length)` entries:
//!
//! ```text
//! history = [(0, 10), (2, 5), (4, 10)]
//!
//! epoch   0    1    2   3   4    5
//! start   H   H+10 H+20 H+25 H+30 H+40
//! ```
//!
//! An epoch spans `[start, start + length)`: a height exactly on a boundary
//! belongs to the later epoch. Only the newest entry may be corrected, and
//! only while the epoch it describes has not started.

use flex_types::{BlockHeight, EpochIndex};
use serde::{Deserialize, Serialize};

use crate::{PayoutError, Result};

/// One entry of the epoch length history.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochLengthEntry {
    /// First epoch this length applies to.
    pub effective_from: EpochIndex,
    /// Blocks per epoch.
    pub length: u64,
}

/// Epoch origin plus length history.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EpochSchedule {
    start_height: Option<BlockHeight>,
    history: Vec<EpochLengthEntry>,
}

impl EpochSchedule {
    /// Create an unconfigured schedule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Height epoch 0 starts at, once configured.
    pub fn start_height(&self) -> Option<BlockHeight> {
        self.start_height
    }

    /// Full length history in effective order.
    pub fn history(&self) -> &[EpochLengthEntry] {
        &self.history
    }

    /// The `index`-th history entry.
    pub fn entry(&self, index: usize) -> Option<EpochLengthEntry> {
        self.history.get(index).copied()
    }

    /// Set the epoch 0 origin. One-time.
    ///
    /// # Errors
    ///
    /// - [`PayoutError::StartHeightAlreadySet`] on a second call
    pub fn set_start_height(&mut self, height: BlockHeight) -> Result<()> {
        if self.start_height.is_some() {
            return Err(PayoutError::StartHeightAlreadySet);
        }
        self.start_height = Some(height);
        Ok(())
    }

    /// Set the length of epoch 0 onward. One-time.
    ///
    /// # Errors
    ///
    /// - [`PayoutError::InitLengthAlreadySet`] on a second call
    /// - [`PayoutError::ZeroEpochLength`] if `length` is zero
    pub fn set_init_length(&mut self, length: u64) -> Result<()> {
        if !self.history.is_empty() {
            return Err(PayoutError::InitLengthAlreadySet);
        }
        if length == 0 {
            return Err(PayoutError::ZeroEpochLength);
        }
        self.history.push(EpochLengthEntry {
            effective_from: 0,
            length,
        });
        Ok(())
    }

    fn configured(&self) -> Result<(BlockHeight, &[EpochLengthEntry])> {
        let start = self.start_height.ok_or(PayoutError::StartHeightNotSet)?;
        if self.history.is_empty() {
            return Err(PayoutError::InitLengthNotSet);
        }
        Ok((start, &self.history))
    }

    /// Epoch containing `height`. Heights before the origin map to epoch 0.
    ///
    /// # Errors
    ///
    /// - [`PayoutError::StartHeightNotSet`] / [`PayoutError::InitLengthNotSet`] if unconfigured
    pub fn epoch_at(&self, height: BlockHeight) -> Result<EpochIndex> {
        let (start, history) = self.configured()?;
        if height < start {
            return Ok(0);
        }

        let mut offset = height - start;
        for (i, entry) in history.iter().enumerate() {
            if let Some(next) = history.get(i + 1) {
                let span = (next.effective_from - entry.effective_from)
                    .checked_mul(entry.length)
                    .ok_or(PayoutError::Overflow)?;
                if offset >= span {
                    offset -= span;
                    continue;
                }
            }
            return Ok(entry.effective_from + offset / entry.length);
        }
        Err(PayoutError::InitLengthNotSet)
    }

    /// First height of `epoch`.
    ///
    /// # Errors
    ///
    /// - [`PayoutError::StartHeightNotSet`] / [`PayoutError::InitLengthNotSet`] if unconfigured
    /// - [`PayoutError::Overflow`] if the height does not fit in 64 bits
    pub fn epoch_start_height(&self, epoch: EpochIndex) -> Result<BlockHeight> {
        let (start, history) = self.configured()?;

        let mut height = start;
        for (i, entry) in history.iter().enumerate() {
            let segment_end = history.get(i + 1).map(|next| next.effective_from);
            let epochs = match segment_end {
                Some(end) if epoch >= end => end - entry.effective_from,
                _ => epoch - entry.effective_from,
            };
            height = epochs
                .checked_mul(entry.length)
                .and_then(|span| height.checked_add(span))
                .ok_or(PayoutError::Overflow)?;
            if segment_end.map_or(true, |end| epoch < end) {
                return Ok(height);
            }
        }
        Err(PayoutError::InitLengthNotSet)
    }

    /// Length in blocks of `epoch`.
    ///
    /// # Errors
    ///
    /// - [`PayoutError::InitLengthNotSet`] if no length is configured
    pub fn length_of(&self, epoch: EpochIndex) -> Result<u64> {
        self.history
            .iter()
            .rev()
            .find(|entry| entry.effective_from <= epoch)
            .map(|entry| entry.length)
            .ok_or(PayoutError::InitLengthNotSet)
    }

    /// Queue a new length effective from the epoch after the one containing
    /// `height`.
    ///
    /// # Errors
    ///
    /// - [`PayoutError::ZeroEpochLength`] if `length` is zero
    /// - [`PayoutError::SameEpochLength`] if `length` equals the last recorded length
    /// - [`PayoutError::NextEpochLengthPending`] if a future change is already queued
    pub fn schedule_next_length(
        &mut self,
        length: u64,
        height: BlockHeight,
    ) -> Result<EpochLengthEntry> {
        let current = self.epoch_at(height)?;
        if length == 0 {
            return Err(PayoutError::ZeroEpochLength);
        }
        let last = self.history.last().copied().ok_or(PayoutError::InitLengthNotSet)?;
        if length == last.length {
            return Err(PayoutError::SameEpochLength);
        }
        if last.effective_from > current {
            return Err(PayoutError::NextEpochLengthPending {
                effective_from: last.effective_from,
            });
        }

        let entry = EpochLengthEntry {
            effective_from: current + 1,
            length,
        };
        self.history.push(entry);
        Ok(entry)
    }

    /// Correct the newest history entry while its epoch has not started.
    ///
    /// # Errors
    ///
    /// - [`PayoutError::ZeroEpochLength`] if `length` is zero
    /// - [`PayoutError::CanOnlyUpdateNextEpochLength`] once the entry took effect
    /// - [`PayoutError::SameEpochLength`] if `length` equals the length it follows
    pub fn update_last_length(
        &mut self,
        length: u64,
        height: BlockHeight,
    ) -> Result<EpochLengthEntry> {
        let current = self.epoch_at(height)?;
        if length == 0 {
            return Err(PayoutError::ZeroEpochLength);
        }
        let count = self.history.len();
        let previous = count
            .checked_sub(2)
            .and_then(|i| self.history.get(i))
            .map(|entry| entry.length);
        let last = self
            .history
            .last_mut()
            .ok_or(PayoutError::InitLengthNotSet)?;
        if current >= last.effective_from {
            return Err(PayoutError::CanOnlyUpdateNextEpochLength);
        }
        if previous == Some(length) {
            return Err(PayoutError::SameEpochLength);
        }

        last.length = length;
        Ok(*last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const H: BlockHeight = 1_000;

    fn configured(length: u64) -> EpochSchedule {
        let mut schedule = EpochSchedule::new();
        schedule.set_start_height(H).expect("start");
        schedule.set_init_length(length).expect("init");
        schedule
    }

    #[test]
    fn test_unconfigured_schedule() {
        let mut schedule = EpochSchedule::new();
        assert_eq!(schedule.epoch_at(H), Err(PayoutError::StartHeightNotSet));
        schedule.set_start_height(H).expect("start");
        assert_eq!(schedule.epoch_at(H), Err(PayoutError::InitLengthNotSet));
        assert_eq!(schedule.epoch_start_height(0), Err(PayoutError::InitLengthNotSet));
    }

    #[test]
    fn test_one_time_setters() {
        let mut schedule = configured(10);
        assert_eq!(
            schedule.set_start_height(H + 1),
            Err(PayoutError::StartHeightAlreadySet)
        );
        assert_eq!(
            schedule.set_init_length(20),
            Err(PayoutError::InitLengthAlreadySet)
        );
    }

    #[test]
    fn test_zero_init_length_rejected() {
        let mut schedule = EpochSchedule::new();
        assert_eq!(schedule.set_init_length(0), Err(PayoutError::ZeroEpochLength));
    }

    #[test]
    fn test_boundary_belongs_to_next_epoch() {
        let schedule = configured(10);
        assert_eq!(schedule.epoch_at(H), Ok(0));
        assert_eq!(schedule.epoch_at(H + 9), Ok(0));
        assert_eq!(schedule.epoch_at(H + 10), Ok(1));
        assert_eq!(schedule.epoch_at(H + 19), Ok(1));
        assert_eq!(schedule.epoch_at(H + 20), Ok(2));
    }

    #[test]
    fn test_height_before_origin_is_epoch_zero() {
        let schedule = configured(10);
        assert_eq!(schedule.epoch_at(0), Ok(0));
        assert_eq!(schedule.epoch_at(H - 1), Ok(0));
    }

    #[test]
    fn test_variable_lengths() {
        let mut schedule = configured(10);
        // In epoch 1, queue length 5 from epoch 2.
        let entry = schedule.schedule_next_length(5, H + 11).expect("next");
        assert_eq!(entry, EpochLengthEntry { effective_from: 2, length: 5 });

        // In epoch 3, queue length 8 from epoch 4.
        let entry = schedule.schedule_next_length(8, H + 27).expect("next");
        assert_eq!(entry.effective_from, 4);

        let starts: Vec<_> = (0..7)
            .map(|e| schedule.epoch_start_height(e).expect("start"))
            .collect();
        assert_eq!(starts, vec![H, H + 10, H + 20, H + 25, H + 30, H + 38, H + 46]);

        assert_eq!(schedule.epoch_at(H + 24), Ok(2));
        assert_eq!(schedule.epoch_at(H + 25), Ok(3));
        assert_eq!(schedule.epoch_at(H + 37), Ok(4));
        assert_eq!(schedule.epoch_at(H + 38), Ok(5));
        assert_eq!(schedule.length_of(3), Ok(5));
        assert_eq!(schedule.length_of(100), Ok(8));
    }

    #[test]
    fn test_same_length_rejected() {
        let mut schedule = configured(10);
        assert_eq!(
            schedule.schedule_next_length(10, H),
            Err(PayoutError::SameEpochLength)
        );
        schedule.schedule_next_length(5, H).expect("next");
        assert_eq!(
            schedule.schedule_next_length(5, H + 30),
            Err(PayoutError::SameEpochLength)
        );
    }

    #[test]
    fn test_pending_change_blocks_second_append() {
        let mut schedule = configured(10);
        schedule.schedule_next_length(5, H).expect("next");
        let err = schedule
            .schedule_next_length(7, H + 3)
            .expect_err("pending");
        assert_eq!(err, PayoutError::NextEpochLengthPending { effective_from: 1 });
        assert_eq!(err.to_string(), "next epoch length already set");
    }

    #[test]
    fn test_update_last_length_window() {
        let mut schedule = configured(10);
        schedule.schedule_next_length(5, H + 2).expect("next");

        let entry = schedule.update_last_length(7, H + 9).expect("update");
        assert_eq!(entry, EpochLengthEntry { effective_from: 1, length: 7 });

        assert_eq!(
            schedule.update_last_length(8, H + 10),
            Err(PayoutError::CanOnlyUpdateNextEpochLength)
        );
        assert_eq!(schedule.entry(1).map(|e| e.length), Some(7));
    }

    #[test]
    fn test_init_entry_never_updatable() {
        let mut schedule = configured(10);
        assert_eq!(
            schedule.update_last_length(20, H),
            Err(PayoutError::CanOnlyUpdateNextEpochLength)
        );
    }

    #[test]
    fn test_update_to_preceding_length_rejected() {
        let mut schedule = configured(10);
        schedule.schedule_next_length(5, H).expect("next");
        assert_eq!(
            schedule.update_last_length(10, H + 1),
            Err(PayoutError::SameEpochLength)
        );
    }

    #[test]
    fn test_start_heights_are_contiguous() {
        let mut schedule = configured(10);
        let mut height = H;
        for (i, length) in [4u64, 9, 3, 12, 1].into_iter().enumerate() {
            height += 10 * (i as u64 + 1);
            if schedule.schedule_next_length(length, height).is_err() {
                continue;
            }
        }
        for epoch in 0..40 {
            let start = schedule.epoch_start_height(epoch).expect("start");
            let next = schedule.epoch_start_height(epoch + 1).expect("start");
            let length = schedule.length_of(epoch).expect("length");
            assert_eq!(next, start + length, "epoch {epoch}");
            assert_eq!(schedule.epoch_at(start), Ok(epoch));
            assert_eq!(schedule.epoch_at(next - 1), Ok(epoch));
        }
    }
}
