//! Serialize a map keyed by chain id, accepting chain names as keys.
//!
//! Keys are written as the chain's canonical name when it has one (`base`, `sepolia`) and as
//! the decimal id otherwise. Both forms are accepted when reading.

use alloy::primitives::ChainId;
use alloy_chains::Chain;
use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{self, MapAccess, Visitor},
    ser::SerializeMap,
};
use std::{collections::HashMap, fmt, marker::PhantomData, str::FromStr};

/// Serializes the map with chain names as keys.
pub fn serialize<V, S>(map: &HashMap<ChainId, V>, serializer: S) -> Result<S::Ok, S::Error>
where
    V: Serialize,
    S: Serializer,
{
    let mut entries: Vec<_> = map.iter().collect();
    entries.sort_by_key(|(chain_id, _)| **chain_id);

    let mut out = serializer.serialize_map(Some(entries.len()))?;
    for (chain_id, value) in entries {
        out.serialize_entry(&Chain::from_id(*chain_id).to_string(), value)?;
    }
    out.end()
}

/// Deserializes a map whose keys are chain names or ids.
pub fn deserialize<'de, V, D>(deserializer: D) -> Result<HashMap<ChainId, V>, D::Error>
where
    V: Deserialize<'de>,
    D: Deserializer<'de>,
{
    struct ChainMapVisitor<V>(PhantomData<V>);

    impl<'de, V: Deserialize<'de>> Visitor<'de> for ChainMapVisitor<V> {
        type Value = HashMap<ChainId, V>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map keyed by chain name or id")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
            let mut map = HashMap::with_capacity(access.size_hint().unwrap_or_default());
            while let Some((key, value)) = access.next_entry::<String, V>()? {
                let chain = Chain::from_str(&key)
                    .map_err(|err| de::Error::custom(format!("invalid chain `{key}`: {err}")))?;
                if map.insert(chain.id(), value).is_some() {
                    return Err(de::Error::custom(format!("duplicate chain `{key}`")));
                }
            }
            Ok(map)
        }
    }

    deserializer.deserialize_map(ChainMapVisitor(PhantomData))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Wrapper {
        #[serde(with = "super")]
        chains: HashMap<ChainId, u32>,
    }

    #[test]
    fn names_and_ids() {
        let parsed: Wrapper =
            serde_json::from_str(r#"{"chains":{"base":1,"19088743":2}}"#).unwrap();
        assert_eq!(parsed.chains, HashMap::from([(8453, 1), (19_088_743, 2)]));

        let json = serde_json::to_string(&parsed).unwrap();
        assert_eq!(json, r#"{"chains":{"base":1,"19088743":2}}"#);
    }

    #[test]
    fn duplicate_chain() {
        let err = serde_json::from_str::<Wrapper>(r#"{"chains":{"base":1,"8453":2}}"#);
        assert!(err.is_err());
    }
}
