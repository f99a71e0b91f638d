use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use probing_core::Schematic;
use probing_observability_deps::tracing::{error, warn};
use probing_store::Table;

use crate::device::{DeviceClock, DeviceCounters};
use crate::hooks::Stage;
use crate::offset::OffsetCounter;
use crate::pending::PendingList;
use crate::record::{TorchTrace, Variable};
use crate::sampler::Sampler;
use crate::timer::Timer;
use crate::vars::VariableSource;

/// Which phase a tracer instance is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TracerState {
    /// First step: every hook registers its module; no rows are emitted
    /// except on force stages (pre/post step).
    Discovery,
    /// Subsequent steps: sampler active, rows flow.
    Steady,
}

struct Inner {
    state: TracerState,
    step: u64,
    step_start: Instant,
    offset: OffsetCounter,
    sampler: Sampler,
    timer: Timer,
    pending: PendingList,
    discovery_finished: bool,
    hook_failures: HashMap<&'static str, u32>,
}

/// The probe sampler, timer, and state machine for one tracer instance.
/// Single-threaded per tracer: hook callbacks execute on
/// the thread calling into the instrumented code, so the
/// mutable state behind the tracer only needs to survive reentrancy, not
/// real concurrency — a `Mutex` rather than an `RwLock` reflects that every
/// hook call mutates.
pub struct Tracer {
    table: Arc<Table>,
    var_table: Arc<Table>,
    device_counters: Arc<dyn DeviceCounters>,
    clock: Arc<dyn DeviceClock>,
    var_source: Arc<dyn VariableSource>,
    sync_before_timestamp: bool,
    maxtry: u32,
    inner: Mutex<Inner>,
}

impl std::fmt::Debug for Tracer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Tracer")
            .field("state", &inner.state)
            .field("step", &inner.step)
            .finish()
    }
}

impl Tracer {
    pub fn new(
        table: Arc<Table>,
        var_table: Arc<Table>,
        device_counters: Arc<dyn DeviceCounters>,
        clock: Arc<dyn DeviceClock>,
        var_source: Arc<dyn VariableSource>,
        sampler_spec: &str,
        sync_before_timestamp: bool,
        maxtry: u32,
    ) -> Self {
        Self {
            table,
            var_table,
            device_counters,
            clock,
            var_source,
            sync_before_timestamp,
            maxtry,
            inner: Mutex::new(Inner {
                state: TracerState::Discovery,
                step: 0,
                step_start: Instant::now(),
                offset: OffsetCounter::new(),
                sampler: Sampler::parse(sampler_spec),
                timer: Timer::new(),
                pending: PendingList::new(),
                discovery_finished: false,
                hook_failures: HashMap::new(),
            }),
        }
    }

    pub fn state(&self) -> TracerState {
        self.inner.lock().state
    }

    pub fn step(&self) -> u64 {
        self.inner.lock().step
    }

    /// Entry point for every hook callback. Never propagates to the host:
    /// a panic inside the sampling/appending logic is caught, logged at
    /// most `maxtry` times per hook, then silently suppressed for the rest
    /// of this tracer's lifetime.
    pub fn on_hook(&self, module_id: &str, stage: Stage) {
        {
            let inner = self.inner.lock();
            let failures = inner.hook_failures.get(stage.name()).copied().unwrap_or(0);
            if failures >= self.maxtry {
                return;
            }
        }

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.on_hook_inner(module_id, stage);
        }));

        if result.is_err() {
            let mut inner = self.inner.lock();
            let count = inner.hook_failures.entry(stage.name()).or_insert(0);
            *count += 1;
            if *count >= self.maxtry {
                error!(hook = stage.name(), tries = *count, "hook suppressed after repeated failures");
            } else {
                warn!(hook = stage.name(), tries = *count, "hook callback failed");
            }
        }
    }

    fn on_hook_inner(&self, module_id: &str, stage: Stage) {
        let is_force = matches!(stage, Stage::PreStep | Stage::PostStep);
        let mut inner = self.inner.lock();
        let offset = inner.offset.observe(module_id, stage) as u64;

        if inner.state == TracerState::Discovery {
            inner.sampler.observe_discovery(module_id);
            if !is_force {
                return;
            }
        } else if !is_force && !inner.sampler.should_sample(module_id) {
            return;
        }

        if self.sync_before_timestamp {
            self.clock.synchronize();
        }

        let wall_offset_ns = inner.step_start.elapsed().as_nanos() as u64;
        let step = inner.step;
        let allocated = self.device_counters.allocated();
        let max_allocated = self.device_counters.max_allocated();
        let cached = self.device_counters.cached();
        let max_cached = self.device_counters.max_cached();

        if stage.is_begin() {
            inner.timer.begin(module_id, stage.group(), self.clock.as_ref());
            let trace = TorchTrace {
                step,
                module_id: module_id.to_string(),
                stage: stage.name(),
                offset,
                wall_offset_ns,
                duration_ns: None,
                allocated,
                max_allocated,
                cached,
                max_cached,
            };
            drop(inner);
            let _ = self.table.append(trace.into_row());
        } else {
            let ended = inner.timer.end(module_id, stage.group(), self.clock.as_ref());
            let trace = TorchTrace {
                step,
                module_id: module_id.to_string(),
                stage: stage.name(),
                offset,
                wall_offset_ns,
                duration_ns: None,
                allocated,
                max_allocated,
                cached,
                max_cached,
            };
            match ended {
                Some((_start, _end, Some(duration))) => {
                    let mut done = trace;
                    done.duration_ns = Some(duration.as_nanos() as u64);
                    drop(inner);
                    let _ = self.table.append(done.into_row());
                }
                Some((start, end, None)) => {
                    inner.pending.push(trace, start, end);
                    drop(inner);
                }
                None => {
                    drop(inner);
                    let _ = self.table.append(trace.into_row());
                }
            }
        }

        if matches!(stage, Stage::PostStep) {
            self.on_post_step();
        }
    }

    /// The `post_step` boundary sequence.
    fn on_post_step(&self) {
        let (resolved, vars, step) = {
            let mut inner = self.inner.lock();
            let resolved = inner.pending.drain(self.clock.as_ref());

            if !inner.discovery_finished {
                inner.sampler.finish_discovery();
                inner.discovery_finished = true;
                inner.state = TracerState::Steady;
            } else {
                inner.sampler.rotate();
            }

            inner.step += 1;
            inner.offset.reset();
            inner.step_start = Instant::now();
            let step = inner.step;
            (resolved, self.var_source.snapshot(), step)
        };

        for trace in resolved {
            let _ = self.table.append(trace.into_row());
        }

        for (name, value) in vars {
            let variable = Variable { step, name, value };
            let _ = self.var_table.append(variable.into_row());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{NullDeviceCounters, WallClock};
    use crate::vars::NullVariableSource;
    use probing_core::{DataType, Field, Schema, TableConfig};

    fn trace_table() -> Arc<Table> {
        let schema = Schema::new(
            TorchTrace::field_names()
                .into_iter()
                .map(|n| Field::new(n, DataType::Null))
                .collect(),
        );
        Arc::new(Table::create("trace", schema, TableConfig::default()).unwrap())
    }

    fn var_table() -> Arc<Table> {
        let schema = Schema::new(
            Variable::field_names()
                .into_iter()
                .map(|n| Field::new(n, DataType::Null))
                .collect(),
        );
        Arc::new(Table::create("vars", schema, TableConfig::default()).unwrap())
    }

    fn tracer() -> Tracer {
        Tracer::new(
            trace_table(),
            var_table(),
            Arc::new(NullDeviceCounters),
            Arc::new(WallClock::default()),
            Arc::new(NullVariableSource),
            "ordered:1.0",
            false,
            3,
        )
    }

    #[test]
    fn discovery_step_emits_no_forward_rows() {
        let tracer = tracer();
        tracer.on_hook("a", Stage::PreForward);
        tracer.on_hook("a", Stage::PostForward);
        assert_eq!(tracer.table.stats().rows_appended, 0);
    }

    #[test]
    fn post_step_is_force_and_transitions_to_steady() {
        let tracer = tracer();
        tracer.on_hook("a", Stage::PreStep);
        tracer.on_hook("a", Stage::PostStep);
        assert_eq!(tracer.state(), TracerState::Steady);
        assert_eq!(tracer.step(), 1);
        assert!(tracer.table.stats().rows_appended >= 2);
    }

    #[test]
    fn steady_state_samples_round_robin_victim() {
        let tracer = tracer();
        tracer.on_hook("bbb", Stage::PreForward);
        tracer.on_hook("a", Stage::PreForward);
        tracer.on_hook("a", Stage::PreStep);
        tracer.on_hook("a", Stage::PostStep);
        assert_eq!(tracer.state(), TracerState::Steady);

        let before = tracer.table.stats().rows_appended;
        tracer.on_hook("a", Stage::PreForward);
        tracer.on_hook("bbb", Stage::PreForward);
        // only the victim ("a", shortest name) should have produced a row
        assert_eq!(tracer.table.stats().rows_appended, before + 1);
    }
}
