//! Queue rows, their payloads, and the names of queues and job types.

pub mod model;
pub mod payload;
pub mod status;

pub use model::{CreateJob, Job};
pub use payload::{DeliveryTask, HousekeepingTask, ScanTask, job_types, queues};
pub use status::{JobPriority, JobStatus};
