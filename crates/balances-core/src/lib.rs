//! Balances relay core.
//!
//! Holds the single in-memory [`Snapshot`] of VCU/DIEM balances and the checks a write must
//! pass before it may replace it. The HTTP surface lives in `balances-cli`.

pub mod config;
pub mod egress;
pub mod gate;
pub mod snapshot;
pub mod store;

pub use config::{ConfigError, Environment, RelayConfig};
pub use gate::{check_credentials, check_payload_shape, Credentials, PayloadRejection};
pub use snapshot::{Balances, CandidateSnapshot, Snapshot};
pub use store::SnapshotStore;
