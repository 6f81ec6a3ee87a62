use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serializer};

use crate::crypto::Hash;

/// Serialize a digest as a hex string
pub fn as_hex<S>(hash: &Hash, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    s.serialize_str(&hash.to_hex())
}

/// Deserialize a hex string into a digest
pub fn from_hex<'de, D>(d: D) -> Result<Hash, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(d)?;
    Hash::from_hex(&s).map_err(D::Error::custom)
}
