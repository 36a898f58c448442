pub mod cloud_storage;
pub mod cosmos_proto;
pub mod ledger_rpc;
pub mod log_redact;
pub mod logging;
pub mod notifier;

pub use cloud_storage::{CloudStorage, FileCloudStorage, MemoryCloudStorage};
pub use ledger_rpc::{LedgerClient, LedgerConnector, RpcLedgerConnector};
pub use notifier::{ConsoleNotifier, Notifier};
