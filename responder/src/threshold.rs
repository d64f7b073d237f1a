//! Named confidence thresholds.
//!
//! Two independent tables map level names to numeric floors: one for
//! saved-reply/annotation sources, one for document sources. Lookup
//! differs by path: the saved-reply path rejects unknown names, the
//! document path silently falls back to `MEDIUM`. Both tables are plain
//! data so deployments can retune them; the document defaults map every
//! level to `0.0` as the legacy configuration did.

use crate::errors::ResponderError;
use serde::{Deserialize, Serialize};

/// Fallback level for lenient lookups.
pub const DEFAULT_LEVEL: &str = "MEDIUM";

/// One named-level table, resolved case-insensitively.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ThresholdTable {
    levels: Vec<(String, f32)>,
}

impl ThresholdTable {
    pub fn new(levels: Vec<(String, f32)>) -> Self {
        Self { levels }
    }

    /// Legacy floors for the saved-reply/annotation path.
    pub fn saved_reply_defaults() -> Self {
        Self::new(vec![
            ("VERYHIGH".into(), 0.70),
            ("HIGH".into(), 0.50),
            ("MEDIUM".into(), 0.25),
            ("LOW".into(), 0.15),
            ("VERYLOW".into(), 0.0),
        ])
    }

    /// Legacy floors for the document path. All zero in the observed
    /// configuration; kept as data rather than assumed intentional.
    pub fn document_defaults() -> Self {
        Self::new(vec![
            ("VERYHIGH".into(), 0.0),
            ("HIGH".into(), 0.0),
            ("MEDIUM".into(), 0.0),
            ("LOW".into(), 0.0),
            ("VERYLOW".into(), 0.0),
        ])
    }

    fn lookup(&self, level: &str) -> Option<f32> {
        let wanted = level.trim().to_uppercase();
        self.levels
            .iter()
            .find(|(name, _)| *name == wanted)
            .map(|(_, floor)| *floor)
    }

    /// Strict floor lookup; an unknown level is a hard input error.
    pub fn floor_strict(&self, level: &str) -> Result<f32, ResponderError> {
        self.lookup(level)
            .ok_or_else(|| ResponderError::UnknownThreshold(level.to_string()))
    }

    /// Lenient floor lookup; an unknown level falls back to [`DEFAULT_LEVEL`].
    pub fn floor_lenient(&self, level: &str) -> f32 {
        self.lookup(level)
            .or_else(|| self.lookup(DEFAULT_LEVEL))
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saved_reply_floors_match_the_legacy_table() {
        let table = ThresholdTable::saved_reply_defaults();
        assert_eq!(table.floor_strict("VERYHIGH").unwrap(), 0.70);
        assert_eq!(table.floor_strict("HIGH").unwrap(), 0.50);
        assert_eq!(table.floor_strict("MEDIUM").unwrap(), 0.25);
        assert_eq!(table.floor_strict("LOW").unwrap(), 0.15);
        assert_eq!(table.floor_strict("VERYLOW").unwrap(), 0.0);
    }

    #[test]
    fn document_floors_are_all_zero() {
        let table = ThresholdTable::document_defaults();
        for level in ["VERYHIGH", "HIGH", "MEDIUM", "LOW", "VERYLOW"] {
            assert_eq!(table.floor_strict(level).unwrap(), 0.0);
        }
    }

    #[test]
    fn unknown_level_is_strict_error_but_lenient_medium() {
        let table = ThresholdTable::saved_reply_defaults();
        let err = table.floor_strict("IMPOSSIBLE").unwrap_err();
        assert!(matches!(err, ResponderError::UnknownThreshold(_)));
        assert_eq!(table.floor_lenient("IMPOSSIBLE"), 0.25);
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let table = ThresholdTable::saved_reply_defaults();
        assert_eq!(table.floor_strict("high").unwrap(), 0.50);
        assert_eq!(table.floor_lenient(" medium "), 0.25);
    }
}
