//! YaoXiang task platform
//!
//! Concurrency layer for embedding a script engine: CPU-bound background work
//! runs on a fixed worker pool, while work bound to an execution context runs
//! only when that context's owner pumps it.
//!
//! # Example
//!
//! ```rust
//! use yaoxiang_platform::{create_default_platform, pump_message_loop, ContextId, ExpectedRuntime};
//!
//! let platform = create_default_platform(2).unwrap();
//! platform
//!     .call_on_background_thread(|| { /* compile something */ }, ExpectedRuntime::Short)
//!     .unwrap();
//!
//! let context = ContextId::next();
//! platform.call_delayed_on_foreground_thread(context, || {}, 0.0);
//! while pump_message_loop(&platform, context) {}
//! ```

#![doc(html_root_url = "https://docs.rs/yaoxiang-platform")]
#![warn(rust_2018_idioms)]

pub mod platform;
pub mod runtime;
pub mod trace;
pub mod util;

pub use platform::{DefaultPlatform, PlatformError, PlatformResult, TeardownReport};
pub use runtime::scheduler::{
    resolve_thread_pool_size, BoxedTask, ContextId, ExpectedRuntime, IdleTask, PostedTask, Task,
    MAX_THREAD_POOL_SIZE,
};
pub use trace::{CategoryGroupFlag, TraceEvent, TracingController};
pub use util::config::PlatformConfig;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Display name
pub const NAME: &str = "YaoXiang Platform (爻象)";

/// Create a platform with the given pool size and start its workers.
///
/// `0` picks the size from the hardware parallelism.
///
/// # Panics
///
/// If `thread_pool_size` is negative.
pub fn create_default_platform(thread_pool_size: i32) -> PlatformResult<DefaultPlatform> {
    let platform = DefaultPlatform::new();
    platform.set_thread_pool_size(thread_pool_size);
    platform.ensure_initialized()?;
    Ok(platform)
}

/// Run one pending foreground task for `context`, if any.
pub fn pump_message_loop(
    platform: &DefaultPlatform,
    context: ContextId,
) -> bool {
    platform.pump_message_loop(context)
}

/// Hand a tracing controller to `platform`.
pub fn set_tracing_controller(
    platform: &DefaultPlatform,
    controller: Box<dyn TracingController>,
) {
    platform.set_tracing_controller(controller)
}
