//! Ordering service acknowledgements.

use serde::{Deserialize, Serialize};

use super::codec::impl_message;
use super::Status;

/// One acknowledgement on a broadcast stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastResponse {
    pub status: Status,
}

impl BroadcastResponse {
    pub fn success() -> Self {
        Self {
            status: Status::Success,
        }
    }
}

impl_message!(BroadcastResponse);
