pub mod buffer;
pub mod error;
mod job;
mod queue;
mod readiness;
mod writer;

pub use buffer::{BufferPool, Pooled, Recyclable, WriteBuffer};
pub use error::PipelineError;
pub use job::WriteJob;
pub use queue::{Admission, JobReceiver, Rejection, WriteQueue, write_queue};
pub use readiness::Readiness;
pub use writer::{WriterPool, WriterStats, write_job};
