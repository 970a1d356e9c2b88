//! Serialization protocol for persisted checkpoints

use crate::error::Result;
use serde::{de::DeserializeOwned, Serialize};

/// Converts checkpoint histories to and from bytes for file-backed savers.
///
/// State values are arbitrary JSON, so a serializer must be self-describing.
pub trait SerializerProtocol: Send + Sync {
    /// Serialize a value to bytes
    fn dumps<T: Serialize>(&self, value: &T) -> Result<Vec<u8>>;

    /// Deserialize a value from bytes
    fn loads<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T>;

    /// File extension used for stored threads
    fn extension(&self) -> &'static str {
        "json"
    }
}

/// Compact JSON (default)
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl SerializerProtocol for JsonSerializer {
    fn dumps<T: Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }

    fn loads<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T> {
        Ok(serde_json::from_slice(data)?)
    }
}

/// Indented JSON, for stores people read by hand
#[derive(Debug, Clone, Copy, Default)]
pub struct PrettyJsonSerializer;

impl SerializerProtocol for PrettyJsonSerializer {
    fn dumps<T: Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(value)?)
    }

    fn loads<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T> {
        Ok(serde_json::from_slice(data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Stored {
        name: String,
        values: serde_json::Value,
    }

    #[test]
    fn test_json_serializers_agree() {
        let data = Stored {
            name: "thread".to_string(),
            values: json!({"selected_entities": ["A", "B"]}),
        };

        let compact = JsonSerializer.dumps(&data).unwrap();
        let pretty = PrettyJsonSerializer.dumps(&data).unwrap();
        assert!(pretty.len() > compact.len());

        let from_pretty: Stored = JsonSerializer.loads(&pretty).unwrap();
        assert_eq!(from_pretty, data);
    }
}
