//! Canonical byte encoding for wire messages.
//!
//! Every message is a serde struct encoded with bincode's default options:
//! fixed-width little-endian integers, fields in declaration order, maps
//! only as `BTreeMap`. Two equal values therefore always encode to the same
//! bytes, which is what lets signatures and payload comparisons work on raw
//! bytes.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to encode {kind}: {reason}")]
    Encode { kind: &'static str, reason: String },

    #[error("failed to decode {kind}: {reason}")]
    Decode { kind: &'static str, reason: String },
}

/// A wire message with a canonical byte form.
pub trait Message: Serialize + DeserializeOwned + Sized {
    fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        bincode::serialize(self).map_err(|e| CodecError::Encode {
            kind: std::any::type_name::<Self>(),
            reason: e.to_string(),
        })
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        bincode::deserialize(bytes).map_err(|e| CodecError::Decode {
            kind: std::any::type_name::<Self>(),
            reason: e.to_string(),
        })
    }
}

/// Implements [`Message`] for a list of types.
macro_rules! impl_message {
    ($($ty:ty),+ $(,)?) => {
        $(impl $crate::protos::codec::Message for $ty {})+
    };
}

pub(crate) use impl_message;
