use std::sync::Mutex;

/// Event recorded in a [`SlidingWindow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricEvent {
    Pass = 0,
    Block = 1,
    Success = 2,
    Error = 3,
}

const EVENT_COUNT: usize = 4;

#[derive(Debug, Clone, Copy, Default)]
struct Bucket {
    start: u64,
    counts: [u64; EVENT_COUNT],
}

/// Bucketed event counters covering the last `interval_ms` milliseconds.
///
/// The interval is split into `bucket_count` equal buckets. A bucket is
/// reset lazily the first time it is written after its slot comes round
/// again, so stale counts never leak into a newer window.
#[derive(Debug)]
pub struct SlidingWindow {
    interval_ms: u64,
    bucket_ms: u64,
    buckets: Mutex<Vec<Bucket>>,
}

impl SlidingWindow {
    /// `bucket_count` is clamped to `1..=interval_ms`.
    pub fn new(interval_ms: u64, bucket_count: u32) -> Self {
        let interval_ms = interval_ms.max(1);
        let bucket_count = u64::from(bucket_count).clamp(1, interval_ms);
        let bucket_ms = interval_ms / bucket_count;
        Self {
            interval_ms: bucket_ms * bucket_count,
            bucket_ms,
            buckets: Mutex::new(vec![Bucket::default(); bucket_count as usize]),
        }
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    fn bucket_start(&self, now: u64) -> u64 {
        now - now % self.bucket_ms
    }

    fn is_live(&self, bucket: &Bucket, now: u64) -> bool {
        now < bucket.start + self.interval_ms && bucket.start <= now
    }

    fn slot(&self, buckets: &mut [Bucket], now: u64) -> usize {
        let start = self.bucket_start(now);
        let idx = ((now / self.bucket_ms) % buckets.len() as u64) as usize;
        if buckets[idx].start != start {
            buckets[idx] = Bucket {
                start,
                counts: [0; EVENT_COUNT],
            };
        }
        idx
    }

    fn live_sum(&self, buckets: &[Bucket], event: MetricEvent, now: u64) -> u64 {
        buckets
            .iter()
            .filter(|b| self.is_live(b, now))
            .map(|b| b.counts[event as usize])
            .sum()
    }

    pub fn add(&self, event: MetricEvent, now: u64, n: u64) {
        let mut buckets = self.buckets.lock().unwrap_or_else(|p| p.into_inner());
        let idx = self.slot(&mut buckets, now);
        buckets[idx].counts[event as usize] += n;
    }

    /// Add one `event` unless that would take the window sum above `limit`.
    ///
    /// The check and the add happen under one lock, so concurrent callers
    /// can never pass more than `limit` between them.
    pub fn try_add(&self, event: MetricEvent, now: u64, limit: f64) -> bool {
        let mut buckets = self.buckets.lock().unwrap_or_else(|p| p.into_inner());
        let idx = self.slot(&mut buckets, now);
        if self.live_sum(&buckets, event, now) as f64 + 1.0 > limit {
            return false;
        }
        buckets[idx].counts[event as usize] += 1;
        true
    }

    /// Take back `n` events added at `now`. No-op once that bucket has rolled over.
    pub fn remove(&self, event: MetricEvent, now: u64, n: u64) {
        let start = self.bucket_start(now);
        let mut buckets = self.buckets.lock().unwrap_or_else(|p| p.into_inner());
        let idx = ((now / self.bucket_ms) % buckets.len() as u64) as usize;
        let bucket = &mut buckets[idx];
        if bucket.start == start {
            bucket.counts[event as usize] = bucket.counts[event as usize].saturating_sub(n);
        }
    }

    /// Sum of `event` over the buckets still inside the window at `now`.
    pub fn sum(&self, event: MetricEvent, now: u64) -> u64 {
        let buckets = self.buckets.lock().unwrap_or_else(|p| p.into_inner());
        self.live_sum(&buckets, event, now)
    }

    pub fn reset(&self) {
        let mut buckets = self.buckets.lock().unwrap_or_else(|p| p.into_inner());
        for bucket in buckets.iter_mut() {
            *bucket = Bucket::default();
        }
    }
}
