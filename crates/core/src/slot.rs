//! Slots and the collected-data mapping.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// A named attribute of the crochet piece.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    /// Kind of piece, e.g. "hat".
    PieceType,
    /// Garment size, e.g. "M" or "small".
    Size,
    /// Main color.
    Color,
    /// Yarn fiber, e.g. "cotton".
    YarnType,
    /// Canonical yarn weight, e.g. "bulky".
    YarnWeight,
    /// Free-form style notes.
    StyleDetails,
    /// Sleeve style, when mentioned.
    SleeveType,
}

impl Slot {
    /// Slots that must be filled before a pattern can be generated, in the
    /// order they are asked for.
    pub const REQUIRED: [Slot; 6] = [
        Slot::PieceType,
        Slot::Size,
        Slot::Color,
        Slot::YarnType,
        Slot::YarnWeight,
        Slot::StyleDetails,
    ];

    /// Returns the key of this slot in the collected-data mapping.
    pub const fn as_str(self) -> &'static str {
        match self {
            Slot::PieceType => "piece_type",
            Slot::Size => "size",
            Slot::Color => "color",
            Slot::YarnType => "yarn_type",
            Slot::YarnWeight => "yarn_weight",
            Slot::StyleDetails => "style_details",
            Slot::SleeveType => "sleeve_type",
        }
    }
}

impl Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The accumulator of filled slots for one conversation.
///
/// A slot is never removed or overwritten once filled, the first value
/// written wins.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectedData(BTreeMap<Slot, String>);

impl CollectedData {
    /// Returns the value of `slot`, if known.
    #[inline]
    pub fn get(&self, slot: Slot) -> Option<&str> {
        self.0.get(&slot).map(String::as_str)
    }

    /// Returns `true` if `slot` is filled.
    #[inline]
    pub fn contains(&self, slot: Slot) -> bool {
        self.0.contains_key(&slot)
    }

    /// Fills `slot` with `value` unless it already has one.
    ///
    /// Returns `true` if the value was written.
    pub fn fill<S: Into<String>>(&mut self, slot: Slot, value: S) -> bool {
        if self.contains(slot) {
            return false;
        }
        self.0.insert(slot, value.into());
        true
    }

    /// Required slots that are still empty, in asking order.
    pub fn missing(&self) -> Vec<Slot> {
        Slot::REQUIRED
            .into_iter()
            .filter(|slot| !self.contains(*slot))
            .collect()
    }

    /// Number of filled slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no slot is filled.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the filled slots in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (Slot, &str)> {
        self.0.iter().map(|(slot, value)| (*slot, value.as_str()))
    }
}

impl<S: Into<String>> FromIterator<(Slot, S)> for CollectedData {
    fn from_iter<I: IntoIterator<Item = (Slot, S)>>(iter: I) -> Self {
        let mut data = CollectedData::default();
        for (slot, value) in iter {
            data.fill(slot, value);
        }
        data
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_first_value_wins() {
        let mut data = CollectedData::default();
        assert!(data.fill(Slot::Color, "blue"));
        assert!(!data.fill(Slot::Color, "red"));
        assert_eq!(data.get(Slot::Color), Some("blue"));
    }

    #[test]
    fn test_missing_in_asking_order() {
        let data: CollectedData =
            [(Slot::Size, "M"), (Slot::YarnType, "wool")].into_iter().collect();
        assert_eq!(
            data.missing(),
            vec![
                Slot::PieceType,
                Slot::Color,
                Slot::YarnWeight,
                Slot::StyleDetails
            ]
        );
    }

    #[test]
    fn test_serialize_as_string_keys() {
        let data: CollectedData =
            [(Slot::PieceType, "hat"), (Slot::SleeveType, "puffy")]
                .into_iter()
                .collect();
        let value = serde_json::to_value(&data).unwrap();
        assert_eq!(value, json!({ "piece_type": "hat", "sleeve_type": "puffy" }));

        let back: CollectedData = serde_json::from_value(value).unwrap();
        assert_eq!(back, data);
    }
}
