//! # Flow Module
//!
//! Gateway rule checking: QPS and concurrency limits, error-count circuit
//! breaking and origin authority lists. [`RuleManager::entry`] either admits
//! a request with an [`Entry`] guard or rejects it with a
//! [`BlockError`](crate::block::BlockError).

mod clock;
mod degrade;
mod manager;
mod rule;
mod window;

pub use clock::{Clock, ManualClock, SystemClock};
pub use degrade::{CircuitBreaker, CircuitState};
pub use manager::{Entry, NodeStats, RuleManager, DEFAULT_BUCKET_COUNT};
pub use rule::{
    AuthorityRule, AuthorityStrategy, DegradeRule, FlowGrade, GatewayFlowRule, ResourceMode,
    RuleError,
};
pub use window::{MetricEvent, SlidingWindow};
