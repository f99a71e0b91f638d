use std::collections::HashMap;
use std::time::Duration;

use crate::device::{DeviceClock, DeviceEventId};
use crate::hooks::StageGroup;

/// Maps `(module_id, stage_group)` to a pending device event.
/// A `pre_X` hook opens the pair; the matching `post_X` hook
/// closes it and asks the clock for the elapsed duration, which may not be
/// ready yet on an asynchronous device timeline.
#[derive(Debug, Default)]
pub struct Timer {
    open: HashMap<(String, StageGroup), DeviceEventId>,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, module_id: &str, group: StageGroup, clock: &dyn DeviceClock) {
        let id = clock.record();
        self.open.insert((module_id.to_string(), group), id);
    }

    /// Closes the pair for `(module_id, group)`, if one is open, and
    /// returns `(start, end)` event ids plus the elapsed duration if the
    /// clock has already resolved it.
    pub fn end(
        &mut self,
        module_id: &str,
        group: StageGroup,
        clock: &dyn DeviceClock,
    ) -> Option<(DeviceEventId, DeviceEventId, Option<Duration>)> {
        let start = self.open.remove(&(module_id.to_string(), group))?;
        let end = clock.record();
        let elapsed = clock.elapsed(start, end);
        Some((start, end, elapsed))
    }
}
