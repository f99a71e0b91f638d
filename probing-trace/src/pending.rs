use crate::device::{DeviceClock, DeviceEventId};
use crate::record::TorchTrace;

struct PendingEntry {
    trace: TorchTrace,
    start: DeviceEventId,
    end: DeviceEventId,
}

/// Rows awaiting a device timing pair to resolve. A
/// row lands here instead of the table when its `post_step` duration isn't
/// known yet; `drain` is called once per step boundary to
/// drain the pending list.
#[derive(Default)]
pub struct PendingList {
    entries: Vec<PendingEntry>,
}

impl std::fmt::Debug for PendingList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingList")
            .field("len", &self.entries.len())
            .finish()
    }
}

impl PendingList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, trace: TorchTrace, start: DeviceEventId, end: DeviceEventId) {
        self.entries.push(PendingEntry { trace, start, end });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolves every pending entry against `clock`. Entries whose timing
    /// never resolves (the device torn down before the pair completed) are
    /// dropped rather than retried.
    pub fn drain(&mut self, clock: &dyn DeviceClock) -> Vec<TorchTrace> {
        self.entries
            .drain(..)
            .filter_map(|entry| {
                clock.elapsed(entry.start, entry.end).map(|duration| {
                    let mut trace = entry.trace;
                    trace.duration_ns = Some(duration.as_nanos() as u64);
                    trace
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceClock, WallClock};

    fn sample_trace() -> TorchTrace {
        TorchTrace {
            step: 0,
            module_id: "m".to_string(),
            stage: "pre_forward",
            offset: 1,
            wall_offset_ns: 0,
            duration_ns: None,
            allocated: 0,
            max_allocated: 0,
            cached: 0,
            max_cached: 0,
        }
    }

    #[test]
    fn drain_fills_in_duration() {
        let clock = WallClock::default();
        let start = clock.record();
        let end = clock.record();
        let mut pending = PendingList::new();
        pending.push(sample_trace(), start, end);
        let resolved = pending.drain(&clock);
        assert_eq!(resolved.len(), 1);
        assert!(resolved[0].duration_ns.is_some());
        assert!(pending.is_empty());
    }
}
