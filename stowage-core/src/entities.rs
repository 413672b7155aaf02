//! Core row structures

use crate::{DestinationType, EntityTable, RowId, Table, TenantId, Timestamp, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Open field set of a row, keyed by column name.
pub type Fields = serde_json::Map<String, Value>;

/// A persisted row as returned by the row store.
///
/// The row store assigns `id` and `created_at`; everything else the caller
/// supplied lives in `fields`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRow {
    pub id: RowId,
    pub table: Table,
    pub fields: Fields,
    pub created_at: Timestamp,
    pub deleted_at: Option<Timestamp>,
}

impl EntityRow {
    /// Look up a column value.
    pub fn field(&self, column: &str) -> Option<&Value> {
        self.fields.get(column)
    }

    /// The `name` column, if it is a string.
    pub fn name(&self) -> Option<&str> {
        self.field("name").and_then(Value::as_str)
    }

    /// The owning tenant, read from the `tenant_id` column.
    pub fn tenant_id(&self) -> Option<TenantId> {
        self.field("tenant_id").and_then(Value::as_i64).map(TenantId)
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Initial placement requested together with a new entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionPayload {
    pub destination_type: DestinationType,
    pub destination_id: RowId,
    pub tenant_id: TenantId,
}

impl TransitionPayload {
    /// Build the `transitions` insert for an entity of `table` with id `entity_id`.
    pub fn to_fields(&self, table: EntityTable, entity_id: RowId) -> Fields {
        let mut fields = Fields::new();
        fields.insert(
            "destination_type".to_string(),
            Value::from(self.destination_type.as_db_str()),
        );
        fields.insert(
            "destination_id".to_string(),
            Value::from(self.destination_id.get()),
        );
        fields.insert("tenant_id".to_string(), Value::from(self.tenant_id.get()));
        fields.insert(
            table.transition_column().to_string(),
            Value::from(entity_id.get()),
        );
        fields
    }
}

/// "Entity X is located at destination Y", as stored in `transitions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub id: RowId,
    pub entity_table: EntityTable,
    pub entity_id: RowId,
    pub destination_type: DestinationType,
    pub destination_id: RowId,
    pub tenant_id: TenantId,
    pub created_at: Timestamp,
}

impl TransitionRecord {
    /// Decode a row of the `transitions` table.
    ///
    /// Exactly one of the entity foreign-key columns must be set.
    pub fn from_row(row: &EntityRow) -> Result<Self, ValidationError> {
        if row.table != Table::Transitions {
            return Err(ValidationError::InvalidValue {
                field: "table".to_string(),
                reason: format!("expected transitions, got {}", row.table),
            });
        }

        let mut references = EntityTable::ALL.into_iter().filter_map(|table| {
            row.field(table.transition_column())
                .and_then(Value::as_i64)
                .map(|raw| (table, raw))
        });
        let (entity_table, raw_entity_id) =
            references
                .next()
                .ok_or_else(|| ValidationError::RequiredFieldMissing {
                    field: "item_id | place_id | container_id".to_string(),
                })?;
        if references.next().is_some() {
            return Err(ValidationError::ConstraintViolation {
                constraint: "single_entity_reference".to_string(),
                reason: "transition references more than one entity".to_string(),
            });
        }

        let destination_type = row
            .field("destination_type")
            .and_then(Value::as_str)
            .ok_or_else(|| ValidationError::RequiredFieldMissing {
                field: "destination_type".to_string(),
            })?
            .parse::<DestinationType>()
            .map_err(|e| ValidationError::InvalidValue {
                field: "destination_type".to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            id: row.id,
            entity_table,
            entity_id: positive_id(raw_entity_id, entity_table.transition_column())?,
            destination_type,
            destination_id: positive_id(
                required_i64(row, "destination_id")?,
                "destination_id",
            )?,
            tenant_id: TenantId(required_i64(row, "tenant_id")?),
            created_at: row.created_at,
        })
    }
}

fn required_i64(row: &EntityRow, field: &str) -> Result<i64, ValidationError> {
    row.field(field)
        .and_then(Value::as_i64)
        .ok_or_else(|| ValidationError::RequiredFieldMissing {
            field: field.to_string(),
        })
}

fn positive_id(raw: i64, field: &str) -> Result<RowId, ValidationError> {
    RowId::new(raw).ok_or_else(|| ValidationError::InvalidValue {
        field: field.to_string(),
        reason: format!("{} is not a positive id", raw),
    })
}

/// Filter for list fetches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowFilter {
    /// Restrict to one tenant; `None` means every tenant visible to the caller.
    pub tenant_id: Option<TenantId>,
    /// Include soft-deleted rows.
    pub include_deleted: bool,
}

impl RowFilter {
    pub fn matches(&self, row: &EntityRow) -> bool {
        if !self.include_deleted && row.is_deleted() {
            return false;
        }
        match self.tenant_id {
            Some(tenant_id) => row.tenant_id() == Some(tenant_id),
            None => true,
        }
    }
}
