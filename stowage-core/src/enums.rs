//! Enum types for Stowage tables and destinations

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// TABLES
// ============================================================================

/// Logical table (collection) in the row store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Items,
    Places,
    Containers,
    Rooms,
    Buildings,
    Furniture,
    Transitions,
}

impl Table {
    /// Table name as used by the row store.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            Table::Items => "items",
            Table::Places => "places",
            Table::Containers => "containers",
            Table::Rooms => "rooms",
            Table::Buildings => "buildings",
            Table::Furniture => "furniture",
            Table::Transitions => "transitions",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

impl FromStr for Table {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_token(s).as_str() {
            "items" => Ok(Table::Items),
            "places" => Ok(Table::Places),
            "containers" => Ok(Table::Containers),
            "rooms" => Ok(Table::Rooms),
            "buildings" => Ok(Table::Buildings),
            "furniture" => Ok(Table::Furniture),
            "transitions" => Ok(Table::Transitions),
            _ => Err(ParseEnumError::new("table", s)),
        }
    }
}

/// Tables whose rows are created together with an initial transition.
///
/// Each variant maps to the fixed foreign-key column a transition row uses
/// to reference it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityTable {
    Places,
    Containers,
    Items,
}

impl EntityTable {
    pub const ALL: [EntityTable; 3] = [EntityTable::Places, EntityTable::Containers, EntityTable::Items];

    /// The underlying row-store table.
    pub fn table(&self) -> Table {
        match self {
            EntityTable::Places => Table::Places,
            EntityTable::Containers => Table::Containers,
            EntityTable::Items => Table::Items,
        }
    }

    /// Column on `transitions` that references rows of this table.
    pub fn transition_column(&self) -> &'static str {
        match self {
            EntityTable::Places => "place_id",
            EntityTable::Containers => "container_id",
            EntityTable::Items => "item_id",
        }
    }
}

impl fmt::Display for EntityTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.table())
    }
}

impl FromStr for EntityTable {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.parse::<Table>() {
            Ok(Table::Places) => Ok(EntityTable::Places),
            Ok(Table::Containers) => Ok(EntityTable::Containers),
            Ok(Table::Items) => Ok(EntityTable::Items),
            _ => Err(ParseEnumError::new("entity table", s)),
        }
    }
}

impl From<EntityTable> for Table {
    fn from(value: EntityTable) -> Self {
        value.table()
    }
}

// ============================================================================
// DESTINATIONS
// ============================================================================

/// Kind of location an entity can be placed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DestinationType {
    Room,
    Place,
    Container,
    Furniture,
}

impl DestinationType {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            DestinationType::Room => "room",
            DestinationType::Place => "place",
            DestinationType::Container => "container",
            DestinationType::Furniture => "furniture",
        }
    }
}

impl fmt::Display for DestinationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

impl FromStr for DestinationType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_token(s).as_str() {
            "room" => Ok(DestinationType::Room),
            "place" => Ok(DestinationType::Place),
            "container" => Ok(DestinationType::Container),
            "furniture" => Ok(DestinationType::Furniture),
            _ => Err(ParseEnumError::new("destination type", s)),
        }
    }
}

// ============================================================================
// REFERENCE LISTS
// ============================================================================

/// Resource kinds that are served as cached reference lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Rooms,
    Places,
    Containers,
    Furniture,
    Buildings,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::Rooms,
        ResourceKind::Places,
        ResourceKind::Containers,
        ResourceKind::Furniture,
        ResourceKind::Buildings,
    ];

    pub fn table(&self) -> Table {
        match self {
            ResourceKind::Rooms => Table::Rooms,
            ResourceKind::Places => Table::Places,
            ResourceKind::Containers => Table::Containers,
            ResourceKind::Furniture => Table::Furniture,
            ResourceKind::Buildings => Table::Buildings,
        }
    }

    /// Reference list that shows rows of `table`, if any.
    pub fn for_table(table: Table) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.table() == table)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.table())
    }
}

// ============================================================================
// PARSING
// ============================================================================

/// Error when parsing an enum from its string form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid {}: {}", self.kind, self.value)
    }
}

impl std::error::Error for ParseEnumError {}

fn normalize_token(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_columns_are_fixed() {
        assert_eq!(EntityTable::Places.transition_column(), "place_id");
        assert_eq!(EntityTable::Containers.transition_column(), "container_id");
        assert_eq!(EntityTable::Items.transition_column(), "item_id");
    }

    #[test]
    fn test_entity_table_parse_rejects_reference_only_tables() {
        assert_eq!("items".parse::<EntityTable>(), Ok(EntityTable::Items));
        assert!("rooms".parse::<EntityTable>().is_err());
        assert!("transitions".parse::<EntityTable>().is_err());
    }

    #[test]
    fn test_destination_type_parse_is_lenient() {
        assert_eq!("Room".parse::<DestinationType>(), Ok(DestinationType::Room));
        assert_eq!(" furniture ".parse::<DestinationType>(), Ok(DestinationType::Furniture));
        let err = "shelf".parse::<DestinationType>().unwrap_err();
        assert_eq!(err.to_string(), "Invalid destination type: shelf");
    }

    #[test]
    fn test_destination_type_serde_uses_snake_case() {
        let json = serde_json::to_value(DestinationType::Container).unwrap();
        assert_eq!(json, serde_json::json!("container"));
    }

    #[test]
    fn test_resource_kind_for_table() {
        assert_eq!(ResourceKind::for_table(Table::Rooms), Some(ResourceKind::Rooms));
        assert_eq!(ResourceKind::for_table(Table::Items), None);
        assert_eq!(ResourceKind::for_table(Table::Transitions), None);
    }
}
