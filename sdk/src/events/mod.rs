//! # Events
//!
//! Commit observation. [`EventHub`] subscribes to a peer's event stream and
//! correlates what it sees with the transaction ids callers are waiting on;
//! [`EventSource`] is the seam it subscribes through.

pub mod hub;
pub mod source;

pub use hub::{
    BlockCallback, ChaincodeCallback, ChaincodeRegistration, EventHub, HubState, TxCallback,
};
pub use source::{EventSource, EventStream, TcpEventSource};
