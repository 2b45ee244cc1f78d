//! (De)serializes [`HashMap`] keys through their string form, so maps keyed by
//! [`Chain`](alloy_chains::Chain) accept both chain names and numeric ids.

use alloy::primitives::map::HashMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error};
use std::{fmt::Display, hash::Hash, str::FromStr};

/// Serializes the map with keys converted via [`ToString`].
pub fn serialize<S, K, V>(map: &HashMap<K, V>, serializer: S) -> Result<S::Ok, S::Error>
where
    K: ToString + Hash + Eq,
    V: Serialize,
    S: Serializer,
{
    map.iter().map(|(k, v)| (k.to_string(), v)).collect::<HashMap<_, _>>().serialize(serializer)
}

/// Deserializes the map with keys parsed via [`FromStr`].
pub fn deserialize<'de, K, V, D>(deserializer: D) -> Result<HashMap<K, V>, D::Error>
where
    K: FromStr<Err: Display> + Hash + Eq,
    V: Deserialize<'de>,
    D: Deserializer<'de>,
{
    HashMap::<String, V>::deserialize(deserializer)?
        .into_iter()
        .map(|(key, value)| {
            K::from_str(&key)
                .map(|key| (key, value))
                .map_err(|err| D::Error::custom(format!("invalid key `{key}`: {err}")))
        })
        .collect()
}
