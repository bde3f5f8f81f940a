pub mod record;
pub mod store;

pub use record::{JobRecord, JobState, StateCounts};
pub use store::ProgressStore;
