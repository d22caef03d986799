pub mod gate;
pub mod pending;

pub use gate::{classify, is_deliverable, validate_snapshot, Decision};
pub use pending::PendingQueue;
