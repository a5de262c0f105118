//! In-memory registry of long-running batch jobs.

mod registry;

pub use registry::{BatchJob, JobRegistry, JobSnapshot, JobStatus, RowError};
