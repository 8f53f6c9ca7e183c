use serde::{Serialize, de::DeserializeOwned};

use crate::Result;

/// The encoding used for payloads crossing the engine boundary.
///
/// Switching the format changes the bytes produced and expected for every
/// payload, never their meaning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Format {
    /// Human readable `json`.
    Json,
    /// Compact `bincode`.
    #[default]
    Binary,
}

impl Format {
    /// Encodes `value` into a freshly allocated buffer.
    ///
    /// # Arguments
    /// * `value` - The payload to encode.
    ///
    /// # Returns
    /// The encoded bytes or a `CodecErr` if the value can't be represented.
    pub fn encode<T: Serialize>(self, value: &T) -> Result<Vec<u8>> {
        let bytes = match self {
            Self::Json => serde_json::to_vec(value)?,
            Self::Binary => bincode::serialize(value)?,
        };

        Ok(bytes)
    }

    /// Decodes a payload previously produced by `encode` with the same format.
    ///
    /// # Arguments
    /// * `bytes` - The encoded payload.
    ///
    /// # Returns
    /// The decoded value or a `CodecErr` if the bytes are malformed.
    pub fn decode<T: DeserializeOwned>(self, bytes: &[u8]) -> Result<T> {
        let value = match self {
            Self::Json => serde_json::from_slice(bytes)?,
            Self::Binary => bincode::deserialize(bytes)?,
        };

        Ok(value)
    }

    /// Whether this is the human readable format.
    pub fn is_json(self) -> bool {
        matches!(self, Self::Json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::specs::MasterModelConfig;

    #[test]
    fn json_fills_missing_fields_with_defaults() {
        let config: MasterModelConfig = Format::Json
            .decode(br#"{"topic_names": ["a", "b"]}"#)
            .unwrap();

        assert_eq!(config.topic_names, ["a", "b"]);
        assert_eq!(config.pwt_name, "pwt");
        assert_eq!(config.nwt_name, "nwt");
        assert_eq!(config.num_document_passes, 10);
        assert!(config.cache_theta);
    }

    #[test]
    fn formats_are_not_interchangeable() {
        let config = MasterModelConfig::with_topics(["t0", "t1"]);
        let bytes = Format::Binary.encode(&config).unwrap();

        assert!(Format::Json.decode::<MasterModelConfig>(&bytes).is_err());
        let decoded: MasterModelConfig = Format::Binary.decode(&bytes).unwrap();
        assert_eq!(decoded, config);
    }

    #[test]
    fn truncated_binary_is_rejected() {
        let config = MasterModelConfig::with_topics(["t0"]);
        let bytes = Format::Binary.encode(&config).unwrap();

        let err = Format::Binary
            .decode::<MasterModelConfig>(&bytes[..bytes.len() / 2])
            .unwrap_err();
        assert!(matches!(err, crate::CodecErr::Binary(_)));
    }
}
