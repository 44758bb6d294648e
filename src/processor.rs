// =============================================================================
// Data processor — pure functions over candle sequences and the store
// =============================================================================

use crate::candle::Candle;
use crate::store::CandleStore;

/// Sort, dedupe (keeping the later occurrence in input order) and return the
/// longest maximal run of candles spaced exactly `interval_secs` apart. Ties
/// between equal-length runs prefer the most recent (highest `open_time`).
///
/// A single-candle input is returned as-is; an empty input returns empty.
pub fn sanitize(candles: &[Candle], interval_secs: i64) -> Vec<Candle> {
    if candles.is_empty() {
        return Vec::new();
    }
    if candles.len() == 1 {
        return vec![candles[0].clone()];
    }

    // Stable sort by open_time preserves input order among equal timestamps,
    // so duplicates for the same open_time land in a contiguous run with the
    // later input occurrence last -- collapsing each run to its last member
    // implements "dedupe keeping the later occurrence".
    let mut indexed: Vec<&Candle> = candles.iter().collect();
    indexed.sort_by_key(|c| c.open_time);

    let mut deduped: Vec<&Candle> = Vec::with_capacity(indexed.len());
    for candle in indexed {
        if deduped.last().map(|c: &&Candle| c.open_time) == Some(candle.open_time) {
            *deduped.last_mut().unwrap() = candle;
        } else {
            deduped.push(candle);
        }
    }

    if deduped.len() == 1 {
        return vec![deduped[0].clone()];
    }

    // Find the longest maximal equidistant run; on ties prefer the one
    // ending at the highest open_time (the more recent run).
    let mut best_start = 0usize;
    let mut best_len = 1usize;
    let mut cur_start = 0usize;
    let mut cur_len = 1usize;

    for i in 1..deduped.len() {
        if deduped[i].open_time - deduped[i - 1].open_time == interval_secs {
            cur_len += 1;
        } else {
            if cur_len > best_len
                || (cur_len == best_len
                    && deduped[cur_start + cur_len - 1].open_time
                        > deduped[best_start + best_len - 1].open_time)
            {
                best_start = cur_start;
                best_len = cur_len;
            }
            cur_start = i;
            cur_len = 1;
        }
    }
    if cur_len > best_len
        || (cur_len == best_len
            && deduped[cur_start + cur_len - 1].open_time
                > deduped[best_start + best_len - 1].open_time)
    {
        best_start = cur_start;
        best_len = cur_len;
    }

    deduped[best_start..best_start + best_len]
        .iter()
        .map(|c| (*c).clone())
        .collect()
}

/// Merge a single candle into the store, preserving the store's invariants
/// (§4.5): overwrite on matching `open_time`, append past the newest,
/// prepend before the oldest (dropped instead of evicting the newest when
/// full), or insert in place for an in-range gap-fill.
pub fn merge(candle: Candle, store: &mut CandleStore) {
    store.merge_one(candle);
}

/// True iff the store is strictly ordered and every consecutive gap equals
/// `interval_secs`.
pub fn is_sorted_equidistant(store: &CandleStore, interval_secs: i64) -> bool {
    let snap = store.snapshot();
    if snap.len() < 2 {
        return true;
    }
    snap.windows(2)
        .all(|w| w[1].open_time - w[0].open_time == interval_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(open_time: i64, close: f64) -> Candle {
        Candle::new(open_time, close, close, close, close, 0.0, None, None, None, None).unwrap()
    }

    #[test]
    fn sanitize_empty_returns_empty() {
        assert!(sanitize(&[], 60).is_empty());
    }

    #[test]
    fn sanitize_single_candle_passthrough() {
        let v = vec![c(100, 1.0)];
        assert_eq!(sanitize(&v, 60).len(), 1);
    }

    #[test]
    fn sanitize_gap_removal_prefers_recent_run() {
        // T, T+60, T+120, T+300, T+360, T+420, T+480 (interval = 60)
        let t = 1_000_000_000i64;
        let v = vec![
            c(t, 1.0),
            c(t + 60, 1.0),
            c(t + 120, 1.0),
            c(t + 300, 1.0),
            c(t + 360, 1.0),
            c(t + 420, 1.0),
            c(t + 480, 1.0),
        ];
        let out = sanitize(&v, 60);
        let times: Vec<i64> = out.iter().map(|c| c.open_time).collect();
        assert_eq!(times, vec![t + 300, t + 360, t + 420, t + 480]);
    }

    #[test]
    fn sanitize_is_idempotent() {
        let t = 1_700_000_000i64;
        let v = vec![c(t, 1.0), c(t + 60, 1.0), c(t + 180, 1.0), c(t + 240, 1.0)];
        let once = sanitize(&v, 60);
        let twice = sanitize(&once, 60);
        let once_times: Vec<i64> = once.iter().map(|c| c.open_time).collect();
        let twice_times: Vec<i64> = twice.iter().map(|c| c.open_time).collect();
        assert_eq!(once_times, twice_times);
    }

    #[test]
    fn sanitize_non_expanding() {
        let t = 1_700_000_000i64;
        let v = vec![c(t, 1.0), c(t + 60, 1.0), c(t + 500, 1.0)];
        assert!(sanitize(&v, 60).len() <= v.len());
    }

    #[test]
    fn sanitize_dedupes_keeping_later_occurrence() {
        let t = 1_700_000_000i64;
        let first = c(t, 1.0);
        let mut second = c(t, 2.0);
        second.close = 2.0;
        let v = vec![first, second.clone(), c(t + 60, 1.0)];
        let out = sanitize(&v, 60);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].close, 2.0);
    }

    #[test]
    fn bounded_ring_eviction() {
        let mut store = CandleStore::new(3, 60);
        for ot in [1_000_000_060i64, 1_000_000_120, 1_000_000_180, 1_000_000_240] {
            merge(c(ot, 1.0), &mut store);
        }
        let snap = store.snapshot();
        let times: Vec<i64> = snap.iter().map(|c| c.open_time).collect();
        assert_eq!(times, vec![1_000_000_120, 1_000_000_180, 1_000_000_240]);
    }

    #[test]
    fn in_progress_overwrite() {
        let mut store = CandleStore::new(5, 60);
        let mut first = c(1_700_000_000, 100.0);
        first.close = 100.0;
        merge(first, &mut store);
        let mut second = c(1_700_000_000, 101.0);
        second.close = 101.0;
        merge(second, &mut store);
        let snap = store.snapshot();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].close, 101.0);
    }

    #[test]
    fn out_of_order_prepend() {
        let mut store = CandleStore::new(5, 60);
        merge(c(1_700_000_060, 1.0), &mut store);
        merge(c(1_700_000_000, 1.0), &mut store);
        let snap = store.snapshot();
        let times: Vec<i64> = snap.iter().map(|c| c.open_time).collect();
        assert_eq!(times, vec![1_700_000_000, 1_700_000_060]);
    }

    #[test]
    fn merge_idempotence() {
        let mut store = CandleStore::new(5, 60);
        let candle = c(1_700_000_000, 1.0);
        merge(candle.clone(), &mut store);
        let once = store.snapshot();
        merge(candle, &mut store);
        let twice = store.snapshot();
        assert_eq!(once.len(), twice.len());
        assert_eq!(once[0].close, twice[0].close);
    }

    #[test]
    fn prepend_at_capacity_drops_incoming_instead_of_evicting_newest() {
        let mut store = CandleStore::new(2, 60);
        merge(c(200, 1.0), &mut store);
        merge(c(260, 1.0), &mut store);
        // Store full at capacity 2; an older candle arrives out of order.
        merge(c(140, 1.0), &mut store);
        let snap = store.snapshot();
        let times: Vec<i64> = snap.iter().map(|c| c.open_time).collect();
        // The incoming older candle is dropped -- newest is never evicted by
        // a prepend.
        assert_eq!(times, vec![200, 260]);
    }
}
