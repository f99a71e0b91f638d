use std::time::{Duration, Instant};

/// A snapshot of device memory accounting at one point in time. The
/// counters are opaque samples the crate stores but never interprets —
/// reading them through a trait, rather than calling into CUDA/PyTorch
/// directly, keeps this crate buildable on hosts with no device runtime
/// linked in, consistent with the "ML framework emulation" non-goal.
pub trait DeviceCounters: Send + Sync {
    fn allocated(&self) -> u64;
    fn max_allocated(&self) -> u64;
    fn cached(&self) -> u64;
    fn max_cached(&self) -> u64;
}

/// Default counters for hosts with no device backend registered.
#[derive(Debug, Default)]
pub struct NullDeviceCounters;

impl DeviceCounters for NullDeviceCounters {
    fn allocated(&self) -> u64 {
        0
    }
    fn max_allocated(&self) -> u64 {
        0
    }
    fn cached(&self) -> u64 {
        0
    }
    fn max_cached(&self) -> u64 {
        0
    }
}

/// Opaque handle to a device timestamp recorded via `DeviceClock::record`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceEventId(pub u64);

/// A begin/end marker pair on the device timing queue. Device
/// events can be asynchronous (queued on a device stream and not yet
/// resolved), so `elapsed` returns `None` until both ends are ready; the
/// tracer defers such rows to the pending list rather than blocking.
pub trait DeviceClock: Send + Sync {
    fn record(&self) -> DeviceEventId;
    fn elapsed(&self, start: DeviceEventId, end: DeviceEventId) -> Option<Duration>;
    fn synchronize(&self);
}

/// A `DeviceClock` backed by the host's wall clock. Every event is ready
/// immediately, so `elapsed` never returns `None`; used as the default
/// clock on hosts with no async device timing to speak of.
#[derive(Debug, Default)]
pub struct WallClock {
    events: parking_lot::Mutex<Vec<Instant>>,
}

impl DeviceClock for WallClock {
    fn record(&self) -> DeviceEventId {
        let mut events = self.events.lock();
        events.push(Instant::now());
        DeviceEventId((events.len() - 1) as u64)
    }

    fn elapsed(&self, start: DeviceEventId, end: DeviceEventId) -> Option<Duration> {
        let events = self.events.lock();
        let start = events.get(start.0 as usize)?;
        let end = events.get(end.0 as usize)?;
        Some(end.saturating_duration_since(*start))
    }

    fn synchronize(&self) {}
}
