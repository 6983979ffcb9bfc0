pub mod handlers;
pub mod helpers;
pub mod in_process;
pub mod mock_ledger;

pub use handlers::{echo_handler, status_handler, EchoHandler, StatusHandler};
pub use helpers::*;
pub use in_process::InProcessTransport;
pub use mock_ledger::MockTransferLedger;
