pub mod conformance;
mod error;
mod memory;
mod record;
#[cfg(feature = "sqlite")]
mod sqlite;
mod traits;

pub use error::StorageError;
pub use memory::MemoryLedger;
pub use record::{RequestRecord, RequestStatus};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteLedger;
pub use traits::RequestLedger;
