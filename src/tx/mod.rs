//! Transaction submission module
//!
//! The submitter is the only component allowed to mutate on-chain state;
//! everything else is a view query.

mod pending;
mod submitter;

pub use pending::{PendingTransaction, TxStatus};
pub use submitter::TransactionSubmitter;
