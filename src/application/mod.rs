//! Application layer: the pure overdue computation (normalize, allocate,
//! aggregate), message composition, target planning and the throttled
//! dispatch pipeline.

pub mod aggregator;
pub mod allocation;
pub mod composer;
pub mod dispatch;
pub mod normalizer;
pub mod overdue;
pub mod planner;
