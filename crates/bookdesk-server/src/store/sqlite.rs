use rusqlite::types::Value as SqlValue;
use serde_json::{Map, Value};
use uuid::Uuid;

use super::{Document, DocumentStore, EntityKind, Filter, StoreError};
use crate::db::{self, DbPool};

/// Documents kept as JSON text in the `documents` table.
#[derive(Clone)]
pub struct SqliteDocumentStore {
    pool: DbPool,
}

impl SqliteDocumentStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn decode(id: String, body: &str) -> Result<Document, StoreError> {
    let body: Map<String, Value> = serde_json::from_str(body)?;
    Ok(Document { id, body })
}

/// JSON scalars as `json_extract` returns them: booleans become 0/1.
fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

impl DocumentStore for SqliteDocumentStore {
    fn get_all(&self, kind: EntityKind, filter: Option<&Filter>) -> Result<Vec<Document>, StoreError> {
        let mut sql = String::from("SELECT id, body FROM documents WHERE collection = ?1");
        let mut params: Vec<SqlValue> = vec![SqlValue::Text(kind.collection().to_string())];

        if let Some(filter) = filter {
            for (field, value) in filter.clauses() {
                let path_idx = params.len() + 1;
                sql.push_str(&format!(
                    " AND json_extract(body, ?{path_idx}) = ?{}",
                    path_idx + 1
                ));
                params.push(SqlValue::Text(format!("$.{field}")));
                params.push(to_sql(value));
            }
        }
        sql.push_str(" ORDER BY created_at, rowid");

        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(params), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut documents = Vec::new();
        for row in rows {
            let (id, body) = row?;
            documents.push(decode(id, &body)?);
        }
        Ok(documents)
    }

    fn get_one(&self, kind: EntityKind, id: &str) -> Result<Option<Document>, StoreError> {
        let conn = self.pool.get()?;
        let result = conn.query_row(
            "SELECT body FROM documents WHERE collection = ?1 AND id = ?2",
            rusqlite::params![kind.collection(), id],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(body) => Ok(Some(decode(id.to_string(), &body)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Database(e)),
        }
    }

    fn create(&self, kind: EntityKind, record: &Map<String, Value>) -> Result<String, StoreError> {
        let id = Uuid::new_v4().simple().to_string();
        let body = serde_json::to_string(record)?;
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO documents (collection, id, body, created_at) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![kind.collection(), id, body, db::now()],
        )?;
        tracing::debug!("Created {} {id}", kind.collection());
        Ok(id)
    }

    fn put(&self, kind: EntityKind, id: &str, record: &Map<String, Value>) -> Result<(), StoreError> {
        let body = serde_json::to_string(record)?;
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO documents (collection, id, body, created_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (collection, id) DO UPDATE SET body = excluded.body",
            rusqlite::params![kind.collection(), id, body, db::now()],
        )?;
        Ok(())
    }

    fn update(&self, kind: EntityKind, id: &str, partial: &Map<String, Value>) -> Result<(), StoreError> {
        let patch = serde_json::to_string(partial)?;
        let conn = self.pool.get()?;
        let affected = conn.execute(
            "UPDATE documents SET body = json_patch(body, ?3) WHERE collection = ?1 AND id = ?2",
            rusqlite::params![kind.collection(), id, patch],
        )?;

        if affected == 0 {
            return Err(StoreError::NotFound {
                kind,
                id: id.to_string(),
            });
        }
        Ok(())
    }

    fn delete(&self, kind: EntityKind, id: &str) -> Result<(), StoreError> {
        let conn = self.pool.get()?;
        let affected = conn.execute(
            "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
            rusqlite::params![kind.collection(), id],
        )?;

        if affected == 0 {
            return Err(StoreError::NotFound {
                kind,
                id: id.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> SqliteDocumentStore {
        SqliteDocumentStore::new(db::create_memory_pool())
    }

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn filter_matches_every_clause() {
        let store = store();
        store
            .create(EntityKind::Payments, &map(json!({"bookingId": "b1", "paymentStatus": "Pending"})))
            .unwrap();
        store
            .create(EntityKind::Payments, &map(json!({"bookingId": "b1", "paymentStatus": "Completed"})))
            .unwrap();
        store
            .create(EntityKind::Payments, &map(json!({"bookingId": "b2", "paymentStatus": "Completed"})))
            .unwrap();

        let filter = Filter::eq("bookingId", "b1").and("paymentStatus", "Completed");
        let docs = store.get_all(EntityKind::Payments, Some(&filter)).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].body["bookingId"], "b1");
    }

    #[test]
    fn boolean_filters_match_json_booleans() {
        let store = store();
        store.put(EntityKind::Users, "u1", &map(json!({"status": true}))).unwrap();
        store.put(EntityKind::Users, "u2", &map(json!({"status": false}))).unwrap();

        let active = store
            .get_all(EntityKind::Users, Some(&Filter::eq("status", true)))
            .unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "u1");
    }

    #[test]
    fn collections_are_isolated() {
        let store = store();
        store.put(EntityKind::Users, "same-id", &map(json!({"name": "A"}))).unwrap();
        assert!(store.get_one(EntityKind::Services, "same-id").unwrap().is_none());
        assert!(store.get_one(EntityKind::Users, "same-id").unwrap().is_some());
    }

    #[test]
    fn update_merges_fields() {
        let store = store();
        let id = store
            .create(EntityKind::Services, &map(json!({"title": "Wash", "price": 10})))
            .unwrap();
        store
            .update(EntityKind::Services, &id, &map(json!({"price": 12.5})))
            .unwrap();

        let doc = store.get_one(EntityKind::Services, &id).unwrap().unwrap();
        assert_eq!(doc.body["title"], "Wash");
        assert_eq!(doc.body["price"], 12.5);
    }

    #[test]
    fn update_and_delete_report_missing_documents() {
        let store = store();
        let err = store
            .update(EntityKind::Bookings, "nope", &map(json!({"status": "Approved"})))
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { kind: EntityKind::Bookings, .. }));

        let err = store.delete(EntityKind::Bookings, "nope").unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn put_replaces_existing_document() {
        let store = store();
        store.put(EntityKind::Users, "u1", &map(json!({"name": "Old", "role": "admin"}))).unwrap();
        store.put(EntityKind::Users, "u1", &map(json!({"name": "New"}))).unwrap();

        let doc = store.get_one(EntityKind::Users, "u1").unwrap().unwrap();
        assert_eq!(doc.body["name"], "New");
        assert!(doc.body.get("role").is_none());
    }
}
