// =============================================================================
// Candle store — bounded, ordered ring keyed by open_time
// =============================================================================
//
// Thin ordered-container wrapper with capacity N. All mutation goes through
// `merge_one`, which implements the processor's merge rules directly against
// the backing deque so store and processor stay in lock-step. Readers take a
// cloned snapshot so they never observe a partially-applied merge.
// =============================================================================

use std::collections::VecDeque;

use crate::candle::Candle;

pub struct CandleStore {
    candles: VecDeque<Candle>,
    capacity: usize,
    interval_secs: i64,
}

impl CandleStore {
    pub fn new(capacity: usize, interval_secs: i64) -> Self {
        Self {
            candles: VecDeque::with_capacity(capacity),
            capacity,
            interval_secs,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn interval_secs(&self) -> i64 {
        self.interval_secs
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// A copy of the store, oldest first -- safe to iterate without holding
    /// any lock on the store itself.
    pub fn snapshot(&self) -> Vec<Candle> {
        self.candles.iter().cloned().collect()
    }

    pub fn first_open_time(&self) -> Option<i64> {
        self.candles.front().map(|c| c.open_time)
    }

    pub fn last_open_time(&self) -> Option<i64> {
        self.candles.back().map(|c| c.open_time)
    }

    /// True iff the store is at least 90% full and has no gaps
    /// (`is_sorted_equidistant`).
    pub fn ready(&self) -> bool {
        let threshold = (self.capacity as f64 * 0.9).ceil() as usize;
        self.candles.len() >= threshold && crate::processor::is_sorted_equidistant(self, self.interval_secs)
    }

    /// Apply the merge rules from §4.5 directly against the backing deque.
    pub(crate) fn merge_one(&mut self, candle: Candle) {
        if let Some(pos) = self.candles.iter().position(|c| c.open_time == candle.open_time) {
            self.candles[pos] = candle;
            return;
        }

        let last = self.candles.back().map(|c| c.open_time);
        let first = self.candles.front().map(|c| c.open_time);

        match (first, last) {
            (None, None) => {
                self.candles.push_back(candle);
            }
            (Some(_), Some(last_ot)) if candle.open_time > last_ot => {
                self.candles.push_back(candle);
                while self.candles.len() > self.capacity {
                    self.candles.pop_front();
                }
            }
            (Some(first_ot), Some(_)) if candle.open_time < first_ot => {
                if self.candles.len() >= self.capacity {
                    // At capacity: the incoming older candle is dropped --
                    // the store is "most-recent N", never evict the newest.
                    return;
                }
                self.candles.push_front(candle);
            }
            _ => {
                // In-range but not matching any existing open_time: insert
                // keeping ascending order.
                let idx = self
                    .candles
                    .iter()
                    .position(|c| c.open_time > candle.open_time)
                    .unwrap_or(self.candles.len());
                self.candles.insert(idx, candle);
                while self.candles.len() > self.capacity {
                    self.candles.pop_front();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::merge;

    fn c(open_time: i64, close: f64) -> Candle {
        Candle::new(open_time, close, close, close, close, 0.0, None, None, None, None).unwrap()
    }

    #[test]
    fn ready_requires_ninety_percent_fill_and_no_gaps() {
        let mut store = CandleStore::new(10, 60);
        for i in 0..9 {
            merge(c(i * 60, 1.0), &mut store);
        }
        assert!(store.ready());
    }

    #[test]
    fn ready_false_when_gap_present() {
        let mut store = CandleStore::new(10, 60);
        for i in 0..8 {
            merge(c(i * 60, 1.0), &mut store);
        }
        merge(c(1000 * 60, 1.0), &mut store);
        assert!(!store.ready());
    }

    #[test]
    fn empty_store_not_ready() {
        let store = CandleStore::new(10, 60);
        assert!(!store.ready());
    }
}
