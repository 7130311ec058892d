use serde::{de::DeserializeOwned, Serialize};

use crate::{GatewayError, Result};

/// Encodes request bodies and decodes response bodies.
pub trait BodyCodec: Send + Sync {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>>;

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T>;
}

/// `serde_json` codec.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonCodec;

impl BodyCodec for JsonCodec {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(value).map_err(|err| GatewayError::Encode(err.to_string()))
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        serde_json::from_slice(bytes).map_err(|err| {
            GatewayError::Decode(format!(
                "invalid response JSON: {err}; body: {}",
                String::from_utf8_lossy(bytes)
            ))
        })
    }
}
