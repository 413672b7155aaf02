//! Identity types for Stowage rows

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Row identifier assigned by the row store.
///
/// Ids are positive integers; zero and negatives never identify a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(i64);

impl RowId {
    /// Wrap a raw id, rejecting non-positive values.
    pub fn new(raw: i64) -> Option<Self> {
        (raw > 0).then_some(Self(raw))
    }

    /// The raw integer value.
    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tenant that owns a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(pub i64);

impl TenantId {
    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_row_id_rejects_non_positive() {
        assert!(RowId::new(0).is_none());
        assert!(RowId::new(-4).is_none());
        assert_eq!(RowId::new(7).map(RowId::get), Some(7));
    }

    #[test]
    fn test_row_id_serializes_as_integer() {
        let id = RowId::new(42).unwrap();
        assert_eq!(serde_json::to_value(id).unwrap(), serde_json::json!(42));
    }

    proptest! {
        #[test]
        fn prop_row_id_accepts_exactly_positive(raw in any::<i64>()) {
            prop_assert_eq!(RowId::new(raw).is_some(), raw > 0);
        }
    }
}
