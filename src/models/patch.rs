//! Explicit "present vs absent" values for partial updates.

use serde::{Deserialize, Deserializer};

/// One field of a partial-update payload.
///
/// A field missing from the JSON body deserializes to [`Patch::Absent`]
/// (through `#[serde(default)]` on the containing struct); a present field
/// must hold a valid `T`. `null` is not accepted as "absent".
#[derive(Debug, Clone, PartialEq)]
pub enum Patch<T> {
    Absent,
    Set(T),
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Patch::Absent
    }
}

impl<T> Patch<T> {
    pub fn is_set(&self) -> bool {
        matches!(self, Patch::Set(_))
    }

    /// Overwrite `target` when a value is present.
    pub fn apply_to(self, target: &mut T) {
        if let Patch::Set(value) = self {
            *target = value;
        }
    }
}

impl<'de, T> Deserialize<'de> for Patch<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        T::deserialize(deserializer).map(Patch::Set)
    }
}
