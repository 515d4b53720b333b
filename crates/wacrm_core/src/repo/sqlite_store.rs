//! SQLite-backed record store.
//!
//! # Responsibility
//! - Map schema-described records to one table per entity kind.
//! - Translate SQLite constraint failures into semantic store errors.
//!
//! # Invariants
//! - Column lists are built from `Entity::SCHEMA`; caller-supplied field
//!   names are checked against the schema before reaching SQL.
//! - Ids, timestamps and status literals are stored as TEXT, booleans as
//!   0/1 INTEGER.

use crate::db::migrations::{current_version, latest_version};
use crate::model::schema::{field_spec, to_fields};
use crate::model::{timestamp, Entity, EntityKind, FieldSpec, FieldType, ListOrder, RecordId};
use crate::model::Timestamp;
use crate::repo::filter::{Comparison, Filter};
use crate::repo::record_store::{RecordStore, StoreError, StoreResult};
use log::warn;
use rusqlite::types::{Value, ValueRef};
use rusqlite::{
    ffi, params, params_from_iter, Connection, ErrorCode, Row, Transaction, TransactionBehavior,
};
use serde_json::{Map, Value as JsonValue};

/// Record store over one migrated SQLite connection.
pub struct SqliteRecordStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRecordStore<'conn> {
    /// Creates a store from a connection returned by `db::open_*`.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        let expected_version = latest_version();
        let actual_version = current_version(conn)?;
        if actual_version != expected_version {
            return Err(StoreError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }
        Ok(Self { conn })
    }
}

impl RecordStore for SqliteRecordStore<'_> {
    fn get<E: Entity>(&self, user_id: &str, id: RecordId) -> StoreResult<Option<E>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE user_id = ?1 AND id = ?2;",
            column_list(E::SCHEMA),
            E::KIND.table()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params![user_id, id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_record_row::<E>(row)?));
        }
        Ok(None)
    }

    fn query<E: Entity>(&self, user_id: &str, filter: &Filter) -> StoreResult<Vec<E>> {
        let mut sql = format!(
            "SELECT {} FROM {} WHERE user_id = ?",
            column_list(E::SCHEMA),
            E::KIND.table()
        );
        let mut bind_values = vec![Value::Text(user_id.to_string())];

        for condition in &filter.conditions {
            let spec = schema_field::<E>(&condition.field)?;
            if condition.value.is_null() && condition.op == Comparison::Eq {
                sql.push_str(&format!(" AND {} IS NULL", spec.name));
                continue;
            }
            sql.push_str(&format!(" AND {} {} ?", spec.name, condition.op.sql()));
            bind_values.push(json_to_sql(E::KIND, spec, &condition.value)?);
        }

        let order_field = match filter.order_by.as_deref() {
            Some(field) => schema_field::<E>(field)?.name,
            None => match E::ORDER {
                ListOrder::Position { .. } => "position",
                ListOrder::CreatedAt => "created_at",
            },
        };
        sql.push_str(&format!(" ORDER BY {order_field} ASC, id ASC"));

        if let Some(limit) = filter.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_record_row::<E>(row)?);
        }
        Ok(records)
    }

    fn put<E: Entity>(&self, record: &E, expected_version: Option<Timestamp>) -> StoreResult<E> {
        let fields = to_fields(record).map_err(|err| {
            StoreError::InvalidData(format!("cannot serialize {}: {err}", E::KIND))
        })?;
        let mut values = Vec::with_capacity(E::SCHEMA.len());
        for spec in E::SCHEMA {
            let value = fields.get(spec.name).unwrap_or(&JsonValue::Null);
            values.push(json_to_sql(E::KIND, spec, value)?);
        }

        match expected_version {
            None => {
                let placeholders = (1..=values.len())
                    .map(|index| format!("?{index}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                let sql = format!(
                    "INSERT INTO {} ({}) VALUES ({placeholders});",
                    E::KIND.table(),
                    column_list(E::SCHEMA)
                );
                self.conn
                    .execute(&sql, params_from_iter(values))
                    .map_err(|err| classify_write_error(E::KIND, err))?;
            }
            Some(expected) => {
                let mut assignments = Vec::new();
                let mut bind_values = Vec::new();
                for (spec, value) in E::SCHEMA.iter().zip(values) {
                    if is_identity_column(spec.name) {
                        continue;
                    }
                    bind_values.push(value);
                    assignments.push(format!("{} = ?{}", spec.name, bind_values.len()));
                }
                bind_values.push(Value::Text(record.id().to_string()));
                let id_index = bind_values.len();
                bind_values.push(Value::Text(record.user_id().to_string()));
                let user_index = bind_values.len();
                bind_values.push(Value::Text(timestamp::format(&expected)));
                let version_index = bind_values.len();

                let sql = format!(
                    "UPDATE {} SET {} WHERE id = ?{id_index} AND user_id = ?{user_index} AND updated_at = ?{version_index};",
                    E::KIND.table(),
                    assignments.join(", ")
                );
                let changed = self
                    .conn
                    .execute(&sql, params_from_iter(bind_values))
                    .map_err(|err| classify_write_error(E::KIND, err))?;
                if changed == 0 {
                    return Err(if self.exists(record.user_id(), E::KIND, record.id())? {
                        StoreError::StaleWrite {
                            kind: E::KIND,
                            id: record.id(),
                        }
                    } else {
                        StoreError::NotFound {
                            kind: E::KIND,
                            id: record.id(),
                        }
                    });
                }
            }
        }

        self.get::<E>(record.user_id(), record.id())?
            .ok_or(StoreError::NotFound {
                kind: E::KIND,
                id: record.id(),
            })
    }

    fn delete<E: Entity>(&self, user_id: &str, id: RecordId) -> StoreResult<()> {
        let sql = format!(
            "DELETE FROM {} WHERE user_id = ?1 AND id = ?2;",
            E::KIND.table()
        );
        let changed = self
            .conn
            .execute(&sql, params![user_id, id.to_string()])
            .map_err(|err| classify_write_error(E::KIND, err))?;
        if changed == 0 {
            return Err(StoreError::NotFound { kind: E::KIND, id });
        }
        Ok(())
    }

    fn exists(&self, user_id: &str, kind: EntityKind, id: RecordId) -> StoreResult<bool> {
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE user_id = ?1 AND id = ?2);",
            kind.table()
        );
        let exists: i64 = self
            .conn
            .query_row(&sql, params![user_id, id.to_string()], |row| row.get(0))?;
        Ok(exists == 1)
    }

    fn count_where(
        &self,
        user_id: &str,
        kind: EntityKind,
        field: &str,
        id: RecordId,
    ) -> StoreResult<u64> {
        let column = kind_field(kind, field)?;
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE user_id = ?1 AND {column} = ?2;",
            kind.table()
        );
        let count: i64 = self
            .conn
            .query_row(&sql, params![user_id, id.to_string()], |row| row.get(0))?;
        u64::try_from(count)
            .map_err(|_| StoreError::InvalidData(format!("negative count {count} for {kind}")))
    }

    fn delete_where(
        &self,
        user_id: &str,
        kind: EntityKind,
        field: &str,
        id: RecordId,
    ) -> StoreResult<u64> {
        let column = kind_field(kind, field)?;
        let sql = format!(
            "DELETE FROM {} WHERE user_id = ?1 AND {column} = ?2;",
            kind.table()
        );
        let removed = self
            .conn
            .execute(&sql, params![user_id, id.to_string()])
            .map_err(|err| classify_write_error(kind, err))?;
        Ok(removed as u64)
    }

    fn atomically<T, Fail, F>(&self, work: F) -> Result<T, Fail>
    where
        F: FnOnce(&Self) -> Result<T, Fail>,
        Fail: From<StoreError>,
    {
        if !self.conn.is_autocommit() {
            return self.within_savepoint(work);
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)
            .map_err(|err| Fail::from(StoreError::from(err)))?;
        let result = work(self)?;
        tx.commit()
            .map_err(|err| Fail::from(StoreError::from(err)))?;
        Ok(result)
    }
}

impl SqliteRecordStore<'_> {
    /// Runs `work` inside an already open transaction, undoing only its own
    /// writes on error.
    fn within_savepoint<T, Fail, F>(&self, work: F) -> Result<T, Fail>
    where
        F: FnOnce(&Self) -> Result<T, Fail>,
        Fail: From<StoreError>,
    {
        self.conn
            .execute_batch("SAVEPOINT wacrm_atomic")
            .map_err(|err| Fail::from(StoreError::from(err)))?;
        match work(self) {
            Ok(value) => {
                self.conn
                    .execute_batch("RELEASE wacrm_atomic")
                    .map_err(|err| Fail::from(StoreError::from(err)))?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback) = self
                    .conn
                    .execute_batch("ROLLBACK TO wacrm_atomic; RELEASE wacrm_atomic")
                {
                    warn!("event=savepoint_rollback module=repo status=error error={rollback}");
                }
                Err(err)
            }
        }
    }
}

fn column_list(schema: &[FieldSpec]) -> String {
    schema
        .iter()
        .map(|spec| spec.name)
        .collect::<Vec<_>>()
        .join(", ")
}

fn is_identity_column(name: &str) -> bool {
    matches!(name, "id" | "user_id" | "created_at")
}

fn schema_field<E: Entity>(name: &str) -> StoreResult<&'static FieldSpec> {
    field_spec::<E>(name).ok_or_else(|| StoreError::UnknownField {
        kind: E::KIND,
        field: name.to_string(),
    })
}

fn kind_field(kind: EntityKind, name: &str) -> StoreResult<&'static str> {
    kind.schema()
        .iter()
        .find(|spec| spec.name == name && spec.ty == FieldType::Id)
        .map(|spec| spec.name)
        .ok_or_else(|| StoreError::UnknownField {
            kind,
            field: name.to_string(),
        })
}

fn json_to_sql(kind: EntityKind, spec: &FieldSpec, value: &JsonValue) -> StoreResult<Value> {
    let converted = match (spec.ty, value) {
        (_, JsonValue::Null) => Some(Value::Null),
        (FieldType::Text | FieldType::Id | FieldType::Timestamp, JsonValue::String(text)) => {
            Some(Value::Text(text.clone()))
        }
        (FieldType::Integer, JsonValue::Number(number)) => number.as_i64().map(Value::Integer),
        (FieldType::Real, JsonValue::Number(number)) => number.as_f64().map(Value::Real),
        (FieldType::Bool, JsonValue::Bool(flag)) => Some(Value::Integer(i64::from(*flag))),
        _ => None,
    };
    converted.ok_or_else(|| {
        StoreError::InvalidData(format!(
            "{kind}.{} expects {:?}, got {value}",
            spec.name, spec.ty
        ))
    })
}

fn sql_to_json(kind: EntityKind, spec: &FieldSpec, value: ValueRef<'_>) -> StoreResult<JsonValue> {
    let converted = match (spec.ty, value) {
        (_, ValueRef::Null) => Some(JsonValue::Null),
        (FieldType::Text | FieldType::Id | FieldType::Timestamp, ValueRef::Text(bytes)) => {
            std::str::from_utf8(bytes)
                .ok()
                .map(|text| JsonValue::String(text.to_string()))
        }
        (FieldType::Integer, ValueRef::Integer(number)) => Some(JsonValue::from(number)),
        (FieldType::Real, ValueRef::Real(number)) => {
            serde_json::Number::from_f64(number).map(JsonValue::Number)
        }
        (FieldType::Real, ValueRef::Integer(number)) => {
            serde_json::Number::from_f64(number as f64).map(JsonValue::Number)
        }
        (FieldType::Bool, ValueRef::Integer(0)) => Some(JsonValue::Bool(false)),
        (FieldType::Bool, ValueRef::Integer(1)) => Some(JsonValue::Bool(true)),
        _ => None,
    };
    converted.ok_or_else(|| {
        StoreError::InvalidData(format!(
            "unexpected {:?} value in {}.{}",
            value.data_type(),
            kind.table(),
            spec.name
        ))
    })
}

fn parse_record_row<E: Entity>(row: &Row<'_>) -> StoreResult<E> {
    let mut fields = Map::with_capacity(E::SCHEMA.len());
    for (index, spec) in E::SCHEMA.iter().enumerate() {
        let value = sql_to_json(E::KIND, spec, row.get_ref(index)?)?;
        fields.insert(spec.name.to_string(), value);
    }
    serde_json::from_value(JsonValue::Object(fields)).map_err(|err| {
        StoreError::InvalidData(format!("invalid persisted {} row: {err}", E::KIND))
    })
}

fn classify_write_error(kind: EntityKind, err: rusqlite::Error) -> StoreError {
    if let rusqlite::Error::SqliteFailure(failure, message) = &err {
        if failure.code == ErrorCode::ConstraintViolation {
            let detail = message.clone().unwrap_or_else(|| failure.to_string());
            match failure.extended_code {
                ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                    return StoreError::UniqueViolation { kind, detail };
                }
                ffi::SQLITE_CONSTRAINT_FOREIGNKEY => {
                    return StoreError::ForeignKeyViolation { kind, detail };
                }
                _ => {}
            }
        }
    }
    StoreError::from(err)
}

#[cfg(test)]
mod tests {
    use super::{json_to_sql, sql_to_json, SqliteRecordStore};
    use crate::db::open_db_in_memory;
    use crate::model::contact::ContactList;
    use crate::model::{timestamp, EntityKind, FieldSpec, FieldType};
    use crate::repo::record_store::{RecordStore, StoreError, StoreResult};
    use uuid::Uuid;
    use rusqlite::types::{Value, ValueRef};
    use rusqlite::Connection;
    use serde_json::json;

    #[test]
    fn bool_fields_map_to_integers_both_ways() {
        let spec = FieldSpec::new("is_default", FieldType::Bool);
        assert_eq!(
            json_to_sql(EntityKind::LeadColumn, &spec, &json!(true)).unwrap(),
            Value::Integer(1)
        );
        assert_eq!(
            sql_to_json(EntityKind::LeadColumn, &spec, ValueRef::Integer(0)).unwrap(),
            json!(false)
        );
        assert!(sql_to_json(EntityKind::LeadColumn, &spec, ValueRef::Integer(7)).is_err());
    }

    #[test]
    fn type_mismatch_is_invalid_data() {
        let spec = FieldSpec::new("position", FieldType::Integer);
        let err = json_to_sql(EntityKind::Lead, &spec, &json!("first")).unwrap_err();
        assert!(matches!(err, StoreError::InvalidData(message) if message.contains("lead.position")));
    }

    #[test]
    fn try_new_rejects_unmigrated_connection() {
        let conn = Connection::open_in_memory().unwrap();
        let err = SqliteRecordStore::try_new(&conn).err().unwrap();
        assert!(matches!(
            err,
            StoreError::UninitializedConnection {
                actual_version: 0,
                ..
            }
        ));

        let migrated = open_db_in_memory().unwrap();
        assert!(SqliteRecordStore::try_new(&migrated).is_ok());
    }

    #[test]
    fn atomically_rolls_back_every_write_on_error() {
        let conn = open_db_in_memory().unwrap();
        let store = SqliteRecordStore::try_new(&conn).unwrap();
        let now = timestamp::now();
        let list = ContactList {
            id: Uuid::new_v4(),
            user_id: "owner-a".to_string(),
            name: "VIP".to_string(),
            description: None,
            created_at: now,
            updated_at: now,
        };

        let result: StoreResult<()> = store.atomically(|inner| {
            inner.put(&list, None)?;
            inner.put(&list, None)?;
            Ok(())
        });

        assert!(matches!(
            result,
            Err(StoreError::UniqueViolation {
                kind: EntityKind::ContactList,
                ..
            })
        ));
        assert!(conn.is_autocommit());
        assert!(store
            .get::<ContactList>("owner-a", list.id)
            .unwrap()
            .is_none());
    }

    #[test]
    fn failed_unit_inside_open_transaction_keeps_outer_writes() {
        let conn = open_db_in_memory().unwrap();
        let store = SqliteRecordStore::try_new(&conn).unwrap();
        let now = timestamp::now();
        let list = |name: &str| ContactList {
            id: Uuid::new_v4(),
            user_id: "owner-a".to_string(),
            name: name.to_string(),
            description: None,
            created_at: now,
            updated_at: now,
        };
        let kept = list("Kept");
        let dropped = list("Dropped");

        conn.execute_batch("BEGIN").unwrap();
        store.put(&kept, None).unwrap();
        let result: StoreResult<()> = store.atomically(|inner| {
            inner.put(&dropped, None)?;
            inner.put(&dropped, None)?;
            Ok(())
        });
        assert!(matches!(result, Err(StoreError::UniqueViolation { .. })));
        assert!(!conn.is_autocommit());
        conn.execute_batch("COMMIT").unwrap();

        assert!(store.get::<ContactList>("owner-a", kept.id).unwrap().is_some());
        assert!(store
            .get::<ContactList>("owner-a", dropped.id)
            .unwrap()
            .is_none());
    }

    #[test]
    fn versioned_put_requires_current_stamp() {
        let conn = open_db_in_memory().unwrap();
        let store = SqliteRecordStore::try_new(&conn).unwrap();
        let now = timestamp::now();
        let mut list = ContactList {
            id: Uuid::new_v4(),
            user_id: "owner-a".to_string(),
            name: "VIP".to_string(),
            description: None,
            created_at: now,
            updated_at: now,
        };
        store.put(&list, None).unwrap();

        list.name = "Gold".to_string();
        list.updated_at = timestamp::next_version(now);
        let stored = store.put(&list, Some(now)).unwrap();
        assert_eq!(stored, list);

        let err = store.put(&list, Some(now)).unwrap_err();
        assert!(matches!(err, StoreError::StaleWrite { .. }));

        list.id = Uuid::new_v4();
        let err = store.put(&list, Some(now)).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }
}
