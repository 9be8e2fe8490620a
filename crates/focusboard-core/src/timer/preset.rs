use serde::{Deserialize, Serialize};

use crate::error::TimerError;

/// A named duration template the user can pick for a countdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    pub id: String,
    pub label: String,
    /// Duration in minutes.
    pub minutes: u64,
}

impl Preset {
    pub fn new(id: impl Into<String>, label: impl Into<String>, minutes: u64) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            minutes,
        }
    }

    /// Get preset duration in seconds.
    ///
    /// Uses saturating arithmetic to prevent overflow with large values.
    pub fn duration_secs(&self) -> u64 {
        self.minutes.saturating_mul(60)
    }
}

/// Ordered, non-empty list of presets.
///
/// Order decides the default selection (index 0) and the cycling order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PresetCatalog {
    presets: Vec<Preset>,
}

impl PresetCatalog {
    /// Build a catalog, rejecting an empty list.
    pub fn new(presets: Vec<Preset>) -> Result<Self, TimerError> {
        if presets.is_empty() {
            return Err(TimerError::EmptyCatalog);
        }
        Ok(Self { presets })
    }

    /// Focus 25 / Deep Work 50 / Break 5.
    pub fn standard() -> Self {
        Self {
            presets: vec![
                Preset::new("focus", "Focus", 25),
                Preset::new("deep-work", "Deep Work", 50),
                Preset::new("break", "Break", 5),
            ],
        }
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    /// True when the catalog holds no presets.
    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Preset> {
        self.presets.get(index)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.presets.iter().position(|p| p.id == id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Preset> {
        self.presets.iter()
    }

    /// Index following `index` in catalog order, wrapping around.
    pub fn next_index(&self, index: usize) -> usize {
        if index + 1 < self.presets.len() {
            index + 1
        } else {
            0
        }
    }
}

impl Default for PresetCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl<'de> Deserialize<'de> for PresetCatalog {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let presets = Vec::<Preset>::deserialize(deserializer)?;
        PresetCatalog::new(presets).map_err(serde::de::Error::custom)
    }
}

impl<'a> IntoIterator for &'a PresetCatalog {
    type Item = &'a Preset;
    type IntoIter = std::slice::Iter<'a, Preset>;

    fn into_iter(self) -> Self::IntoIter {
        self.presets.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_catalog_has_three_presets() {
        let c = PresetCatalog::standard();
        assert_eq!(c.len(), 3);
        assert!(!c.is_empty());
        assert_eq!(c.get(0).map(|p| p.minutes), Some(25));
        assert_eq!(c.get(1).map(|p| p.minutes), Some(50));
        assert_eq!(c.get(2).map(|p| p.minutes), Some(5));
    }

    #[test]
    fn empty_catalog_is_rejected() {
        assert_eq!(PresetCatalog::new(vec![]), Err(TimerError::EmptyCatalog));
    }

    #[test]
    fn next_index_wraps() {
        let c = PresetCatalog::standard();
        assert_eq!(c.next_index(0), 1);
        assert_eq!(c.next_index(1), 2);
        assert_eq!(c.next_index(2), 0);
    }

    #[test]
    fn position_finds_by_id() {
        let c = PresetCatalog::standard();
        assert_eq!(c.position("deep-work"), Some(1));
        assert_eq!(c.position("nap"), None);
    }

    #[test]
    fn duration_secs_saturates() {
        let p = Preset::new("huge", "Huge", u64::MAX);
        assert_eq!(p.duration_secs(), u64::MAX);
    }

    #[test]
    fn deserialize_rejects_empty_list() {
        let parsed: Result<PresetCatalog, _> = serde_json::from_str("[]");
        assert!(parsed.is_err());
    }
}
