//! In-process event bus for generation lifecycle events.

pub mod bus;

pub use bus::{EventBus, LifecycleEvent};

/// A generation entered the queue.
pub const EVENT_GENERATION_QUEUED: &str = "generation.queued";
/// A generation finished and its version was committed.
pub const EVENT_GENERATION_SUCCEEDED: &str = "generation.succeeded";
/// A generation failed (provider error or exhausted retries).
pub const EVENT_GENERATION_FAILED: &str = "generation.failed";
/// A generation was cancelled by its owner.
pub const EVENT_GENERATION_CANCELLED: &str = "generation.cancelled";
/// A generation was forcibly failed by the timeout sweep.
pub const EVENT_GENERATION_TIMED_OUT: &str = "generation.timed_out";
