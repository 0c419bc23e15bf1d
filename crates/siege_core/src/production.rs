//! Time-indexed production queues for construction and training.
//!
//! A queue never advances on its own. Every batch records the tick range it
//! occupies, and how much of it is finished is recomputed from the current
//! tick on each read:
//!
//! ```text
//! ready = min(quantity, floor((now - start) / unit_time))
//! ```
//!
//! [`ProductionQueue::settle`] only moves finished quantity out of the queue
//! so later reads are cheaper; skipping it never changes an answer.
//!
//! All calculations use integer math for deterministic simulation.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::catalog::AssetId;
use crate::error::{GameError, Result};
use crate::Tick;

/// One queued order for `quantity` units of one asset.
///
/// `quantity` is the part not yet settled into inventory. Settling a prefix
/// shrinks it and moves `start` forward by the settled units' time, so `end`
/// never changes once scheduled except through cancellation re-chaining.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Batch {
    /// Asset being produced.
    pub asset: AssetId,
    /// Units not yet settled. Always greater than zero.
    pub quantity: u32,
    /// Ticks per unit.
    pub unit_time: Tick,
    /// Tick at which the first unsettled unit started.
    pub start: Tick,
    /// Tick at which the last unit finishes.
    pub end: Tick,
}

impl Batch {
    fn scheduled(asset: AssetId, quantity: u32, unit_time: Tick, start: Tick) -> Result<Self> {
        let end = unit_time
            .checked_mul(u64::from(quantity))
            .and_then(|duration| start.checked_add(duration))
            .ok_or(GameError::ArithmeticOverflow("batch end tick"))?;
        Ok(Self {
            asset,
            quantity,
            unit_time,
            start,
            end,
        })
    }

    /// Total ticks the batch occupies.
    #[must_use]
    pub const fn duration(&self) -> Tick {
        self.end - self.start
    }

    /// Whether every unit is finished at `now`.
    #[must_use]
    pub const fn is_complete(&self, now: Tick) -> bool {
        now >= self.end
    }

    /// Whether the batch is the one being worked on at `now`.
    #[must_use]
    pub const fn is_in_progress(&self, now: Tick) -> bool {
        self.start <= now && now < self.end
    }

    /// Units finished at `now` but not yet settled.
    #[must_use]
    pub fn ready_quantity(&self, now: Tick) -> u32 {
        if now >= self.end {
            return self.quantity;
        }
        if now <= self.start || self.unit_time == 0 {
            return 0;
        }
        let finished = (now - self.start) / self.unit_time;
        u32::try_from(finished).map_or(self.quantity, |n| n.min(self.quantity))
    }

    /// Sum over ready units of the ticks each has been ready since `since`.
    ///
    /// A unit finishing at `t` contributes `now - max(t, since)`. This is what
    /// a ready-but-unsettled producer has earned since the last payout.
    #[must_use]
    pub fn ready_unit_ticks(&self, now: Tick, since: Tick) -> u128 {
        let ready = u128::from(self.ready_quantity(now));
        if ready == 0 || now <= since {
            return 0;
        }
        let now_w = u128::from(now);
        let since_w = u128::from(since);
        let start = u128::from(self.start);
        if self.unit_time == 0 {
            return ready * now_w.saturating_sub(start.max(since_w));
        }
        let unit = u128::from(self.unit_time);
        // Units finished at or before `since` have been ready the whole window.
        let early = if since_w >= start {
            ((since_w - start) / unit).min(ready)
        } else {
            0
        };
        let late = ready - early;
        // Σ_{k=early+1..=ready} (now - start - k·unit)
        let k_sum = ready * (ready + 1) / 2 - early * (early + 1) / 2;
        early * (now_w - since_w) + late * (now_w - start) - unit * k_sum
    }
}

/// Result of settling a queue: units moved into inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Promotion {
    /// Asset promoted.
    pub asset: AssetId,
    /// Units promoted.
    pub quantity: u32,
}

/// Result of cancelling a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelOutcome {
    /// The removed batch as it was before cancellation.
    pub batch: Batch,
    /// Units that were already finished and must go to inventory.
    pub produced: u32,
    /// Units that will never be produced.
    pub unproduced: u32,
    /// Ticks every later batch moved earlier.
    pub shift: Tick,
}

/// FIFO queue of batches for one owner and one category.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ProductionQueue {
    batches: VecDeque<Batch>,
}

impl ProductionQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            batches: VecDeque::new(),
        }
    }

    /// Check if the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Number of batches in the queue.
    #[must_use]
    pub fn len(&self) -> usize {
        self.batches.len()
    }

    /// Batch at a queue index.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Batch> {
        self.batches.get(index)
    }

    /// All batches in queue order.
    pub fn iter(&self) -> impl Iterator<Item = &Batch> {
        self.batches.iter()
    }

    /// Tick at which a batch appended at `now` would start.
    #[must_use]
    pub fn next_start(&self, now: Tick) -> Tick {
        self.batches.back().map_or(now, |last| last.end.max(now))
    }

    /// Append a batch behind everything already queued.
    ///
    /// Returns the new batch's queue index.
    pub fn append(
        &mut self,
        asset: AssetId,
        quantity: u32,
        unit_time: Tick,
        now: Tick,
    ) -> Result<usize> {
        if quantity == 0 {
            return Err(GameError::ZeroQuantity);
        }
        let batch = Batch::scheduled(asset, quantity, unit_time, self.next_start(now))?;
        self.batches.push_back(batch);
        Ok(self.batches.len() - 1)
    }

    /// Finished-but-unsettled units of an asset at `now`.
    #[must_use]
    pub fn ready_quantity(&self, asset: AssetId, now: Tick) -> u32 {
        self.batches
            .iter()
            .filter(|batch| batch.asset == asset)
            .fold(0u32, |acc, batch| acc.saturating_add(batch.ready_quantity(now)))
    }

    /// All units of an asset still in the queue, finished or not.
    #[must_use]
    pub fn unsettled_quantity(&self, asset: AssetId) -> u32 {
        self.batches
            .iter()
            .filter(|batch| batch.asset == asset)
            .fold(0u32, |acc, batch| acc.saturating_add(batch.quantity))
    }

    /// Total units in the queue across all assets.
    #[must_use]
    pub fn total_quantity(&self) -> u64 {
        self.batches.iter().map(|batch| u64::from(batch.quantity)).sum()
    }

    /// Remove the batch at `index`, which must hold `asset`.
    ///
    /// Later batches are re-chained so the queue stays gapless: if the
    /// removed batch was in progress the next one starts at `now`, otherwise
    /// everything behind it moves up by the removed batch's duration.
    pub fn cancel(&mut self, index: usize, asset: AssetId, now: Tick) -> Result<CancelOutcome> {
        let batch = self
            .batches
            .get(index)
            .filter(|batch| batch.asset == asset)
            .ok_or(GameError::BatchNotFound { asset, index })?;
        if batch.is_complete(now) {
            return Err(GameError::AlreadyCompleted { index });
        }

        let produced = batch.ready_quantity(now);
        let unproduced = batch.quantity - produced;
        let in_progress = batch.is_in_progress(now);
        let duration = batch.duration();

        let Some(batch) = self.batches.remove(index) else {
            return Err(GameError::BatchNotFound { asset, index });
        };

        let shift = if in_progress {
            self.batches
                .get(index)
                .map_or(0, |next| next.start.saturating_sub(now))
        } else {
            duration
        };
        for later in self.batches.iter_mut().skip(index) {
            later.start = later.start.saturating_sub(shift);
            later.end = later.end.saturating_sub(shift);
        }

        Ok(CancelOutcome {
            batch,
            produced,
            unproduced,
            shift,
        })
    }

    /// Move every finished unit out of the queue.
    ///
    /// Idempotent for a fixed `now`.
    pub fn settle(&mut self, now: Tick) -> Vec<Promotion> {
        let mut promotions = Vec::new();

        while self.batches.front().is_some_and(|batch| batch.is_complete(now)) {
            if let Some(done) = self.batches.pop_front() {
                promotions.push(Promotion {
                    asset: done.asset,
                    quantity: done.quantity,
                });
            }
        }

        if let Some(front) = self.batches.front_mut() {
            let ready = front.ready_quantity(now);
            if ready > 0 {
                front.quantity -= ready;
                front.start += front.unit_time * u64::from(ready);
                promotions.push(Promotion {
                    asset: front.asset,
                    quantity: ready,
                });
            }
        }

        promotions
    }
}
