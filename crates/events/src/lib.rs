//! Intake events and the analytics facade.
//!
//! Events are facts about completed intake actions. They are emitted after the
//! primary write has committed, through an [`AnalyticsSink`], and a sink
//! failure never affects the action that produced the event.

pub mod event;
pub mod sink;

pub use event::{Event, IntakeEvent};
pub use sink::{AnalyticsError, AnalyticsSink, InMemoryAnalyticsSink, TracingAnalyticsSink};
