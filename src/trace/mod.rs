//! Trace-event pass-through
//!
//! The platform forwards instrumentation calls to an optional
//! [`TracingController`]. Without one attached, every call returns an inert
//! value: event id `0`, a permanently disabled category flag, and the
//! placeholder name [`PLACEHOLDER_CATEGORY_NAME`].

pub mod log_controller;

pub use log_controller::LogTracingController;

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use once_cell::sync::Lazy;

/// Name reported for categories when no controller is attached.
pub const PLACEHOLDER_CATEGORY_NAME: &str = "dummy";

/// Bit set in a [`CategoryGroupFlag`] while recording is enabled.
pub const ENABLED_FOR_RECORDING: u8 = 1 << 0;

static DISABLED_FLAG: Lazy<CategoryGroupFlag> = Lazy::new(CategoryGroupFlag::default);

/// Shared enabled-state of a trace category group.
///
/// Instrumentation sites keep the flag and check it cheaply before building
/// events; the controller flips it when tracing starts or stops.
#[derive(Debug, Clone, Default)]
pub struct CategoryGroupFlag(Arc<AtomicU8>);

impl CategoryGroupFlag {
    /// A flag with the given initial bits.
    pub fn new(bits: u8) -> Self {
        Self(Arc::new(AtomicU8::new(bits)))
    }

    /// The shared flag handed out when no controller is attached. Never enabled.
    pub fn disabled() -> Self {
        DISABLED_FLAG.clone()
    }

    /// Current bits.
    #[inline]
    pub fn bits(&self) -> u8 {
        self.0.load(Ordering::Acquire)
    }

    /// Whether any recording bit is set.
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.bits() != 0
    }

    /// Replace the bits. Only controllers should call this.
    #[inline]
    pub fn set_bits(
        &self,
        bits: u8,
    ) {
        self.0.store(bits, Ordering::Release);
    }

    /// Whether both handles refer to the same flag.
    #[inline]
    pub fn same_flag(
        &self,
        other: &CategoryGroupFlag,
    ) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Trace event phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TracePhase {
    Begin,
    End,
    Complete,
    Instant,
    AsyncBegin,
    AsyncEnd,
    Counter,
    Metadata,
}

impl TracePhase {
    /// Single-character code used in the trace-event format.
    pub fn as_char(self) -> char {
        match self {
            TracePhase::Begin => 'B',
            TracePhase::End => 'E',
            TracePhase::Complete => 'X',
            TracePhase::Instant => 'I',
            TracePhase::AsyncBegin => 'b',
            TracePhase::AsyncEnd => 'e',
            TracePhase::Counter => 'C',
            TracePhase::Metadata => 'M',
        }
    }
}

/// Value of a trace event argument.
#[derive(Debug, Clone, PartialEq)]
pub enum TraceValue {
    Bool(bool),
    Uint(u64),
    Int(i64),
    Double(f64),
    String(String),
}

impl std::fmt::Display for TraceValue {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            TraceValue::Bool(v) => write!(f, "{}", v),
            TraceValue::Uint(v) => write!(f, "{}", v),
            TraceValue::Int(v) => write!(f, "{}", v),
            TraceValue::Double(v) => write!(f, "{}", v),
            TraceValue::String(v) => write!(f, "{:?}", v),
        }
    }
}

/// Named trace event argument.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceArg {
    pub name: String,
    pub value: TraceValue,
}

impl TraceArg {
    pub fn new(
        name: impl Into<String>,
        value: TraceValue,
    ) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// A trace event as submitted by instrumentation.
#[derive(Debug, Clone)]
pub struct TraceEvent<'a> {
    pub phase: TracePhase,
    pub category: &'a CategoryGroupFlag,
    pub name: &'a str,
    pub scope: Option<&'a str>,
    pub id: u64,
    pub bind_id: u64,
    pub args: &'a [TraceArg],
    pub flags: u32,
}

impl<'a> TraceEvent<'a> {
    /// An event with no scope, ids, args or flags.
    pub fn new(
        phase: TracePhase,
        category: &'a CategoryGroupFlag,
        name: &'a str,
    ) -> Self {
        Self {
            phase,
            category,
            name,
            scope: None,
            id: 0,
            bind_id: 0,
            args: &[],
            flags: 0,
        }
    }

    /// Attach arguments.
    pub fn with_args(
        mut self,
        args: &'a [TraceArg],
    ) -> Self {
        self.args = args;
        self
    }
}

/// Backend receiving trace events from the platform.
///
/// Once attached, the platform owns the controller and calls
/// [`stop_tracing`](Self::stop_tracing) before dropping it.
///
/// Every method runs with the platform lock held. Implementations must not
/// call back into the platform (posting tasks, pumping, tracing) or they
/// deadlock, and should return quickly: pumps and submissions on other
/// threads wait for them.
pub trait TracingController: Send {
    /// Record an event and return a handle for later duration updates.
    fn add_trace_event(
        &mut self,
        event: &TraceEvent<'_>,
    ) -> u64;

    /// Close the duration of the event identified by `handle`.
    fn update_trace_event_duration(
        &mut self,
        category: &CategoryGroupFlag,
        name: &str,
        handle: u64,
    );

    /// Flag for the named category group.
    fn get_category_group_enabled(
        &mut self,
        name: &str,
    ) -> CategoryGroupFlag;

    /// Display name of the category group behind `category`.
    fn get_category_group_name(
        &self,
        category: &CategoryGroupFlag,
    ) -> String;

    /// Stop recording. Called at platform teardown.
    fn stop_tracing(&mut self);
}

#[cfg(test)]
mod tests;
