//! Common type definitions.
//!
//! All entity ids are surrogate integers assigned by the database (`GENERATED ALWAYS AS
//! IDENTITY` columns), wrapped in type aliases so signatures say which table they point at:
//!
//! - [`UserId`]: admin user account
//! - [`TokenId`]: issued bearer token row
//! - [`FoodId`]: catalog food
//! - [`TasteId`]: taste vocabulary entry
//! - [`CountryId`]: country vocabulary entry
//!
//! The [`active_flag`] serde helper keeps the historical 0/1 encoding of the user active flag on
//! the wire while the rest of the code works with `bool`.

pub type UserId = i32;
pub type TokenId = i32;
pub type FoodId = i32;
pub type TasteId = i32;
pub type CountryId = i32;

/// Convert the stored 0/1 active column into a bool. Anything non-zero counts as active.
pub fn flag_to_bool(flag: i32) -> bool {
    flag != 0
}

/// Convert a bool into the stored 0/1 active column.
pub fn bool_to_flag(active: bool) -> i32 {
    i32::from(active)
}

/// Serialize a `bool` as `0`/`1`, and accept `0`/`1` or `true`/`false` on input.
pub mod active_flag {
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(super::bool_to_flag(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Flag {
            Int(i64),
            Bool(bool),
        }

        match Flag::deserialize(deserializer)? {
            Flag::Bool(b) => Ok(b),
            Flag::Int(0) => Ok(false),
            Flag::Int(1) => Ok(true),
            Flag::Int(other) => Err(de::Error::custom(format!("active flag must be 0 or 1, got {other}"))),
        }
    }
}
