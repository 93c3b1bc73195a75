//! A tracing controller that writes trace events to the `tracing` facade.

use std::collections::HashSet;
use std::time::Instant;

use indexmap::IndexMap;
use tracing::{debug, trace};

use super::{
    CategoryGroupFlag, TraceEvent, TracePhase, TracingController, ENABLED_FOR_RECORDING,
    PLACEHOLDER_CATEGORY_NAME,
};

/// Open event awaiting its duration update.
#[derive(Debug)]
struct OpenEvent {
    name: String,
    started: Instant,
}

/// Controller that logs trace events at `TRACE` level.
///
/// A category group such as `"yx,gc"` is enabled when any of its
/// comma-separated categories is in the enabled set. Recording starts on
/// construction; [`stop_tracing`](TracingController::stop_tracing) clears
/// every flag.
#[derive(Debug)]
pub struct LogTracingController {
    enabled: HashSet<String>,
    groups: IndexMap<String, CategoryGroupFlag>,
    open: IndexMap<u64, OpenEvent>,
    next_handle: u64,
    recording: bool,
}

impl LogTracingController {
    /// Create a controller recording the given categories.
    pub fn new<I, S>(categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            enabled: categories.into_iter().map(Into::into).collect(),
            groups: IndexMap::new(),
            open: IndexMap::new(),
            next_handle: 1,
            recording: true,
        }
    }

    /// Resume recording after a stop and re-enable matching flags.
    pub fn start_tracing(&mut self) {
        self.recording = true;
        for (name, flag) in &self.groups {
            flag.set_bits(Self::bits_for(&self.enabled, true, name));
        }
        debug!(groups = self.groups.len(), "tracing started");
    }

    /// Whether recording is active.
    #[inline]
    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Number of events whose duration has not been updated yet.
    #[inline]
    pub fn open_events(&self) -> usize {
        self.open.len()
    }

    fn bits_for(
        enabled: &HashSet<String>,
        recording: bool,
        group: &str,
    ) -> u8 {
        if recording && group.split(',').any(|c| enabled.contains(c.trim())) {
            ENABLED_FOR_RECORDING
        } else {
            0
        }
    }
}

impl TracingController for LogTracingController {
    fn add_trace_event(
        &mut self,
        event: &TraceEvent<'_>,
    ) -> u64 {
        if !self.recording || !event.category.is_enabled() {
            return 0;
        }

        let handle = self.next_handle;
        self.next_handle += 1;

        let category = self.get_category_group_name(event.category);
        let args = event
            .args
            .iter()
            .map(|arg| format!("{}={}", arg.name, arg.value))
            .collect::<Vec<_>>()
            .join(" ");
        trace!(
            handle,
            phase = %event.phase.as_char(),
            category = %category,
            name = event.name,
            scope = event.scope.unwrap_or(""),
            id = event.id,
            args = %args,
            "trace event"
        );

        if matches!(event.phase, TracePhase::Begin | TracePhase::Complete) {
            self.open.insert(
                handle,
                OpenEvent {
                    name: event.name.to_string(),
                    started: Instant::now(),
                },
            );
        }
        handle
    }

    fn update_trace_event_duration(
        &mut self,
        _category: &CategoryGroupFlag,
        name: &str,
        handle: u64,
    ) {
        match self.open.shift_remove(&handle) {
            Some(open) => trace!(
                handle,
                name = %open.name,
                duration_us = open.started.elapsed().as_micros() as u64,
                "trace event duration"
            ),
            None => debug!(handle, name, "duration update for unknown trace event"),
        }
    }

    fn get_category_group_enabled(
        &mut self,
        name: &str,
    ) -> CategoryGroupFlag {
        if let Some(flag) = self.groups.get(name) {
            return flag.clone();
        }
        let flag = CategoryGroupFlag::new(Self::bits_for(&self.enabled, self.recording, name));
        self.groups.insert(name.to_string(), flag.clone());
        flag
    }

    fn get_category_group_name(
        &self,
        category: &CategoryGroupFlag,
    ) -> String {
        self.groups
            .iter()
            .find(|(_, flag)| flag.same_flag(category))
            .map(|(name, _)| name.clone())
            .unwrap_or_else(|| PLACEHOLDER_CATEGORY_NAME.to_string())
    }

    fn stop_tracing(&mut self) {
        if !self.recording {
            return;
        }
        self.recording = false;
        for flag in self.groups.values() {
            flag.set_bits(0);
        }
        debug!(open_events = self.open.len(), "tracing stopped");
        self.open.clear();
    }
}
