//! Tri-state field update for nullable record fields.
//!
//! # Invariants
//! - A missing JSON key decodes as `Keep`, an explicit `null` as `Clear`.
//! - `Keep` leaves the target untouched; it is never serialized.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Change requested for one optional field in an update payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch<T> {
    /// Field not provided; keep the stored value.
    Keep,
    /// Field explicitly cleared to null.
    Clear,
    /// Field set to a new value.
    Set(T),
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Self::Keep
    }
}

impl<T> Patch<T> {
    pub fn is_keep(&self) -> bool {
        matches!(self, Self::Keep)
    }

    /// Returns the new value when the patch sets one.
    pub fn as_set(&self) -> Option<&T> {
        match self {
            Self::Set(value) => Some(value),
            _ => None,
        }
    }

    /// Writes this patch into an optional slot.
    pub fn apply_to(self, target: &mut Option<T>) {
        match self {
            Self::Keep => {}
            Self::Clear => *target = None,
            Self::Set(value) => *target = Some(value),
        }
    }
}

impl<T> From<Option<T>> for Patch<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Self::Set(value),
            None => Self::Clear,
        }
    }
}

impl<T: Serialize> Serialize for Patch<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Set(value) => serializer.serialize_some(value),
            Self::Keep | Self::Clear => serializer.serialize_none(),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(Self::from)
    }
}

#[cfg(test)]
mod tests {
    use super::Patch;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Payload {
        #[serde(default, skip_serializing_if = "Patch::is_keep")]
        email: Patch<String>,
    }

    #[test]
    fn missing_key_is_keep_and_null_is_clear() {
        let missing: Payload = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.email, Patch::Keep);

        let cleared: Payload = serde_json::from_str(r#"{"email":null}"#).unwrap();
        assert_eq!(cleared.email, Patch::Clear);

        let set: Payload = serde_json::from_str(r#"{"email":"a@b.io"}"#).unwrap();
        assert_eq!(set.email, Patch::Set("a@b.io".to_string()));
    }

    #[test]
    fn keep_is_omitted_when_serialized() {
        let json = serde_json::to_string(&Payload::default()).unwrap();
        assert_eq!(json, "{}");

        let json = serde_json::to_string(&Payload {
            email: Patch::Clear,
        })
        .unwrap();
        assert_eq!(json, r#"{"email":null}"#);
    }

    #[test]
    fn apply_to_follows_three_states() {
        let mut slot = Some("old".to_string());
        Patch::Keep.apply_to(&mut slot);
        assert_eq!(slot.as_deref(), Some("old"));
        Patch::Set("new".to_string()).apply_to(&mut slot);
        assert_eq!(slot.as_deref(), Some("new"));
        Patch::Clear.apply_to(&mut slot);
        assert_eq!(slot, None);
    }
}
