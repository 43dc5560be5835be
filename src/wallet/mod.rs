//! Wallet module - provider adapter and session establishment
//!
//! This module provides:
//! - The request/response wallet provider trait and its HTTP bridge impl
//! - Vendor error-code mapping at the adapter boundary
//! - The connection manager that verifies the network and builds contract handles

pub mod provider;
pub mod session;

pub use provider::{HttpWalletProvider, WalletProvider};
pub use session::{ConnectOptions, Session, SessionManager};
