//! Serde adapter for [`Amount`] fields in config and scenario files.
//!
//! TOML integers stop at `i64`, so amounts are written as plain integers when
//! they fit and as decimal strings when they do not:
//!
//! ```toml
//! rate_per_second = 100
//! amount = "340282366920938463463374607431768211455"
//! ```
//!
//! Use with `#[serde(with = "accrue_core::serde_amount")]`, or
//! `accrue_core::serde_amount::option` for `Option<Amount>`.

use crate::types::Amount;
use serde::{de, Deserializer, Serializer};
use std::fmt;

pub fn serialize<S: Serializer>(amount: &Amount, serializer: S) -> Result<S::Ok, S::Error> {
    match i64::try_from(*amount) {
        Ok(small) => serializer.serialize_i64(small),
        Err(_) => serializer.serialize_str(&amount.to_string()),
    }
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Amount, D::Error> {
    deserializer.deserialize_any(AmountVisitor)
}

struct AmountVisitor;

impl<'de> de::Visitor<'de> for AmountVisitor {
    type Value = Amount;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a non-negative integer or a decimal string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
        Ok(Amount::from(v))
    }

    fn visit_u128<E: de::Error>(self, v: u128) -> Result<Amount, E> {
        Ok(v)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Amount, E> {
        Amount::try_from(v).map_err(|_| E::invalid_value(de::Unexpected::Signed(v), &self))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
        v.trim()
            .replace('_', "")
            .parse()
            .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
    }
}

/// `Option<Amount>` variant; pair with `#[serde(default)]`
pub mod option {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize)]
    struct Wrapped(#[serde(with = "super")] Amount);

    pub fn serialize<S: Serializer>(
        amount: &Option<Amount>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        amount.map(Wrapped).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Amount>, D::Error> {
        Ok(Option::<Wrapped>::deserialize(deserializer)?.map(|Wrapped(amount)| amount))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Holder {
        #[serde(with = "super")]
        amount: Amount,
        #[serde(default, with = "super::option")]
        cap: Option<Amount>,
    }

    #[test]
    fn test_integer_and_string_forms() {
        let small: Holder = serde_json::from_str(r#"{"amount": 100}"#).unwrap();
        assert_eq!(small, Holder { amount: 100, cap: None });

        let big: Holder = serde_json::from_str(&format!(
            r#"{{"amount": "{}", "cap": 7}}"#,
            Amount::MAX
        ))
        .unwrap();
        assert_eq!(big.amount, Amount::MAX);
        assert_eq!(big.cap, Some(7));
    }

    #[test]
    fn test_large_values_serialize_as_strings() {
        let json = serde_json::to_string(&Holder {
            amount: Amount::MAX,
            cap: Some(5),
        })
        .unwrap();
        assert_eq!(json, format!(r#"{{"amount":"{}","cap":5}}"#, Amount::MAX));
    }

    #[test]
    fn test_negative_and_garbage_rejected() {
        assert!(serde_json::from_str::<Holder>(r#"{"amount": -1}"#).is_err());
        assert!(serde_json::from_str::<Holder>(r#"{"amount": "ten"}"#).is_err());
    }
}
