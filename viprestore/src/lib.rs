pub mod batch;
pub mod config;
pub mod constants;
pub mod errors;
pub mod filter;
pub mod model;
pub mod path_graph;
pub mod remote;
pub mod selection;

// Re-export commonly used types
pub use batch::{BatchOrchestrator, BatchResult, ItemOutcome, ItemStatus};
pub use config::{Config, ConfigManager, SystemConfig};
pub use errors::{FormatError, RemoteError, RestoreError};
pub use filter::{FilterCriteria, TimeRange};
pub use model::{ServiceRecord, ServiceSnapshot};
pub use path_graph::PathGraph;
pub use remote::{Credentials, HttpControllerClient, RemoteClient, Session};
pub use selection::SelectionFile;
