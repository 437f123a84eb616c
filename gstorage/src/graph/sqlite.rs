use super::{now_millis, GraphStore};
use crate::cleanup::{CleanupParams, CleanupScope};
use crate::descriptor::OWNERSHIP_RELATION;
use crate::errors::{Result, StorageError};
use crate::models::{
    Attributes, EntityRef, EntityType, GraphEntity, GraphRelationship, GraphStats, LinkResult,
    NodeRef, SyncMarker,
};
use crate::utils::id::stable_edge_id;
use rusqlite::types::ToSql;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Graph store persisted in a single SQLite file. Properties are kept as a JSON
/// object per entity; every public operation runs in its own transaction.
pub struct SqliteGraphStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteGraphStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let store = Self {
            conn: Arc::new(Mutex::new(Connection::open_in_memory()?)),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    fn initialize_schema(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            "BEGIN;
            CREATE TABLE IF NOT EXISTS entities (
                label TEXT NOT NULL,
                id TEXT NOT NULL,
                family TEXT NOT NULL,
                properties TEXT NOT NULL,
                lastupdated INTEGER NOT NULL,
                firstseen INTEGER NOT NULL,
                PRIMARY KEY (label, id)
            );
            CREATE TABLE IF NOT EXISTS relationships (
                edge_id TEXT PRIMARY KEY,
                rel_type TEXT NOT NULL,
                source_label TEXT NOT NULL,
                source_id TEXT NOT NULL,
                target_label TEXT NOT NULL,
                target_id TEXT NOT NULL,
                lastupdated INTEGER NOT NULL,
                firstseen INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_rel_source ON relationships (source_label, source_id);
            CREATE INDEX IF NOT EXISTS idx_rel_target ON relationships (target_label, target_id);
            CREATE INDEX IF NOT EXISTS idx_rel_type ON relationships (rel_type);
            COMMIT;",
        )?;
        Ok(())
    }
}

fn node_key(node: &NodeRef) -> String {
    format!("{}:{}", node.label, node.id)
}

fn entity_exists(tx: &Transaction<'_>, node: &NodeRef) -> Result<bool> {
    let found = tx
        .query_row(
            "SELECT 1 FROM entities WHERE label = ?1 AND id = ?2",
            params![node.label, node.id],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

fn row_to_entity(row: &Row<'_>) -> rusqlite::Result<(GraphEntity, String)> {
    Ok((
        GraphEntity {
            label: row.get(0)?,
            id: row.get(1)?,
            family: row.get(2)?,
            properties: Attributes::new(),
            lastupdated: SyncMarker(row.get(4)?),
            firstseen: row.get(5)?,
        },
        row.get(3)?,
    ))
}

fn hydrate(raw: (GraphEntity, String)) -> Result<GraphEntity> {
    let (mut entity, properties) = raw;
    entity.properties = serde_json::from_str(&properties)?;
    Ok(entity)
}

fn row_to_relationship(row: &Row<'_>) -> rusqlite::Result<GraphRelationship> {
    Ok(GraphRelationship {
        relation: row.get(0)?,
        source: NodeRef::new(row.get::<_, String>(1)?, row.get::<_, String>(2)?),
        target: NodeRef::new(row.get::<_, String>(3)?, row.get::<_, String>(4)?),
        lastupdated: SyncMarker(row.get(5)?),
        firstseen: row.get(6)?,
    })
}

/// SQL predicate selecting the nodes at `(label_col, id_col)` that fall in `scope`.
fn scope_predicate(scope: &CleanupScope, label_col: &str, id_col: &str) -> String {
    match scope {
        CleanupScope::Account => {
            format!("({label_col} = :account_label AND {id_col} = :account_id)")
        }
        CleanupScope::Owned => format!(
            "EXISTS (SELECT 1 FROM relationships o
                WHERE o.rel_type = :ownership
                  AND o.source_label = :account_label AND o.source_id = :account_id
                  AND o.target_label = {label_col} AND o.target_id = {id_col})"
        ),
        CleanupScope::ContainedBy { .. } => format!(
            "EXISTS (SELECT 1 FROM relationships c
                JOIN relationships o
                  ON o.target_label = c.source_label AND o.target_id = c.source_id
                WHERE c.rel_type = :contain_rel AND c.source_label = :parent
                  AND c.target_label = {label_col} AND c.target_id = {id_col}
                  AND o.rel_type = :ownership
                  AND o.source_label = :account_label AND o.source_id = :account_id)"
        ),
    }
}

/// Named parameters referenced by `scope_predicate` for `scope`. Only parameters that
/// appear in the statement may be bound.
fn scope_params<'a>(
    scope: &'a CleanupScope,
    params: &'a CleanupParams,
) -> Vec<(&'static str, &'a dyn ToSql)> {
    let mut bound: Vec<(&'static str, &'a dyn ToSql)> = vec![
        (":account_label", &params.account.label),
        (":account_id", &params.account.id),
    ];
    match scope {
        CleanupScope::Account => {}
        CleanupScope::Owned => bound.push((":ownership", &OWNERSHIP_RELATION)),
        CleanupScope::ContainedBy { parent, relation } => {
            bound.push((":ownership", &OWNERSHIP_RELATION));
            bound.push((":parent", parent));
            bound.push((":contain_rel", relation));
        }
    }
    bound
}

impl GraphStore for SqliteGraphStore {
    fn merge_entity(
        &self,
        entity_type: &EntityType,
        identifier: &str,
        attributes: Attributes,
        marker: SyncMarker,
    ) -> Result<EntityRef> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let existing: Option<String> = tx
            .query_row(
                "SELECT properties FROM entities WHERE label = ?1 AND id = ?2",
                params![entity_type.label, identifier],
                |row| row.get(0),
            )
            .optional()?;

        let created = match existing {
            Some(raw) => {
                let mut properties: Attributes = serde_json::from_str(&raw)?;
                properties.extend(attributes);
                tx.execute(
                    "UPDATE entities SET properties = ?1, lastupdated = ?2, family = ?3
                     WHERE label = ?4 AND id = ?5",
                    params![
                        serde_json::to_string(&properties)?,
                        marker.0,
                        entity_type.family,
                        entity_type.label,
                        identifier
                    ],
                )?;
                false
            }
            None => {
                tx.execute(
                    "INSERT INTO entities (label, id, family, properties, lastupdated, firstseen)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        entity_type.label,
                        identifier,
                        entity_type.family,
                        serde_json::to_string(&attributes)?,
                        marker.0,
                        now_millis()
                    ],
                )?;
                true
            }
        };
        tx.commit()?;
        Ok(EntityRef {
            node: NodeRef::new(entity_type.label, identifier),
            created,
        })
    }

    fn merge_relationship(
        &self,
        relation: &str,
        source: &NodeRef,
        target: &NodeRef,
        marker: SyncMarker,
    ) -> Result<LinkResult> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        for endpoint in [source, target] {
            if !entity_exists(&tx, endpoint)? {
                return Ok(LinkResult::TargetMissing {
                    missing: endpoint.clone(),
                });
            }
        }

        let edge_id = stable_edge_id(relation, &node_key(source), &node_key(target));
        let updated = tx.execute(
            "UPDATE relationships SET lastupdated = ?1 WHERE edge_id = ?2",
            params![marker.0, edge_id],
        )?;
        let result = if updated > 0 {
            LinkResult::MatchedExisting
        } else {
            tx.execute(
                "INSERT INTO relationships
                    (edge_id, rel_type, source_label, source_id, target_label, target_id, lastupdated, firstseen)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    edge_id,
                    relation,
                    source.label,
                    source.id,
                    target.label,
                    target.id,
                    marker.0,
                    now_millis()
                ],
            )?;
            LinkResult::Created
        };
        tx.commit()?;
        Ok(result)
    }

    fn delete_stale_entities(
        &self,
        label: &str,
        scope: &CleanupScope,
        params: &CleanupParams,
    ) -> Result<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let sql = format!(
            "SELECT e.id FROM entities e
             WHERE e.label = :label AND e.lastupdated <> :marker AND {}",
            scope_predicate(scope, "e.label", "e.id")
        );
        let mut bound = scope_params(scope, params);
        bound.push((":label", &label));
        bound.push((":marker", &params.marker.0));

        let stale: Vec<String> = {
            let mut stmt = tx.prepare(&sql)?;
            let rows = stmt.query_map(bound.as_slice(), |row| row.get(0))?;
            rows.collect::<rusqlite::Result<_>>()?
        };

        for id in &stale {
            tx.execute(
                "DELETE FROM relationships
                 WHERE (source_label = ?1 AND source_id = ?2) OR (target_label = ?1 AND target_id = ?2)",
                params![label, id],
            )?;
            tx.execute(
                "DELETE FROM entities WHERE label = ?1 AND id = ?2",
                params![label, id],
            )?;
        }
        tx.commit()?;
        Ok(stale.len())
    }

    fn delete_stale_relationships(
        &self,
        relation: &str,
        source_label: &str,
        target_label: &str,
        scope: &CleanupScope,
        params: &CleanupParams,
    ) -> Result<usize> {
        let conn = self.lock()?;
        let sql = format!(
            "DELETE FROM relationships
             WHERE rel_type = :relation
               AND source_label = :source_label
               AND target_label = :target_label
               AND lastupdated <> :marker
               AND {}",
            scope_predicate(
                scope,
                "relationships.source_label",
                "relationships.source_id"
            )
        );
        let mut bound = scope_params(scope, params);
        bound.push((":relation", &relation));
        bound.push((":source_label", &source_label));
        bound.push((":target_label", &target_label));
        bound.push((":marker", &params.marker.0));
        let deleted = conn.execute(&sql, bound.as_slice())?;
        Ok(deleted)
    }

    fn entity(&self, label: &str, identifier: &str) -> Result<Option<GraphEntity>> {
        let conn = self.lock()?;
        let raw = conn
            .query_row(
                "SELECT label, id, family, properties, lastupdated, firstseen
                 FROM entities WHERE label = ?1 AND id = ?2",
                params![label, identifier],
                row_to_entity,
            )
            .optional()?;
        raw.map(hydrate).transpose()
    }

    fn entities_by_label(&self, label: &str) -> Result<Vec<GraphEntity>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT label, id, family, properties, lastupdated, firstseen
             FROM entities WHERE label = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![label], row_to_entity)?;
        let mut entities = Vec::new();
        for raw in rows {
            entities.push(hydrate(raw?)?);
        }
        Ok(entities)
    }

    fn relationships(&self, relation: Option<&str>) -> Result<Vec<GraphRelationship>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT rel_type, source_label, source_id, target_label, target_id, lastupdated, firstseen
             FROM relationships
             WHERE ?1 IS NULL OR rel_type = ?1
             ORDER BY rel_type, source_label, source_id, target_label, target_id",
        )?;
        let rows = stmt.query_map(params![relation], row_to_relationship)?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    fn stats(&self) -> Result<GraphStats> {
        let conn = self.lock()?;
        let mut stats = GraphStats::default();

        let mut stmt = conn.prepare("SELECT label, COUNT(*) FROM entities GROUP BY label")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;
        for row in rows {
            let (label, count) = row?;
            stats.entities.insert(label, count as usize);
        }

        let mut stmt =
            conn.prepare("SELECT rel_type, COUNT(*) FROM relationships GROUP BY rel_type")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;
        for row in rows {
            let (relation, count) = row?;
            stats.relationships.insert(relation, count as usize);
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    const ACCOUNT: EntityType = EntityType::new("aws", "AWSAccount");
    const DB: EntityType = EntityType::new("glue", "GlueDatabase");
    const TABLE: EntityType = EntityType::new("glue", "GlueTable");

    fn account() -> NodeRef {
        NodeRef::new("AWSAccount", "000000000000")
    }

    fn params(marker: i64) -> CleanupParams {
        CleanupParams {
            account: account(),
            marker: SyncMarker(marker),
        }
    }

    #[test]
    fn entity_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("graph.sqlite");
        {
            let store = SqliteGraphStore::open(&path).unwrap();
            let mut attrs = Attributes::new();
            attrs.insert("databaseName".into(), json!("customer_database"));
            attrs.insert("tags".into(), json!(["a", "b"]));
            store.merge_entity(&DB, "db-arn", attrs, SyncMarker(7)).unwrap();
        }
        let store = SqliteGraphStore::open(&path).unwrap();
        let entity = store.entity("GlueDatabase", "db-arn").unwrap().unwrap();
        assert_eq!(entity.family, "glue");
        assert_eq!(entity.lastupdated, SyncMarker(7));
        assert_eq!(entity.properties["databaseName"], "customer_database");
        assert_eq!(entity.properties["tags"], json!(["a", "b"]));
    }

    #[test]
    fn merge_overwrites_supplied_fields_only() {
        let store = SqliteGraphStore::open_in_memory().unwrap();
        let mut first = Attributes::new();
        first.insert("a".into(), json!(1));
        first.insert("b".into(), json!(2));
        assert!(store.merge_entity(&DB, "x", first, SyncMarker(1)).unwrap().created);
        let firstseen = store.entity("GlueDatabase", "x").unwrap().unwrap().firstseen;

        let mut second = Attributes::new();
        second.insert("b".into(), serde_json::Value::Null);
        assert!(!store.merge_entity(&DB, "x", second, SyncMarker(2)).unwrap().created);

        let entity = store.entity("GlueDatabase", "x").unwrap().unwrap();
        assert_eq!(entity.properties["a"], json!(1));
        assert_eq!(entity.properties["b"], serde_json::Value::Null);
        assert_eq!(entity.firstseen, firstseen);
        assert_eq!(store.stats().unwrap().entities["GlueDatabase"], 1);
    }

    #[test]
    fn contained_children_are_scoped_through_their_owned_parent() {
        let store = SqliteGraphStore::open_in_memory().unwrap();
        store
            .merge_entity(&ACCOUNT, "000000000000", Attributes::new(), SyncMarker(1))
            .unwrap();
        store.merge_entity(&DB, "db", Attributes::new(), SyncMarker(6)).unwrap();
        store.merge_entity(&TABLE, "old", Attributes::new(), SyncMarker(5)).unwrap();
        store.merge_entity(&TABLE, "new", Attributes::new(), SyncMarker(6)).unwrap();
        let db = NodeRef::new("GlueDatabase", "db");
        store
            .merge_relationship(OWNERSHIP_RELATION, &account(), &db, SyncMarker(6))
            .unwrap();
        for (table, marker) in [("old", 5), ("new", 6)] {
            store
                .merge_relationship(
                    "CONTAINS",
                    &db,
                    &NodeRef::new("GlueTable", table),
                    SyncMarker(marker),
                )
                .unwrap();
        }

        let scope = CleanupScope::ContainedBy {
            parent: "GlueDatabase",
            relation: "CONTAINS",
        };
        let removed = store.delete_stale_entities("GlueTable", &scope, &params(6)).unwrap();
        assert_eq!(removed, 1);
        assert!(store.entity("GlueTable", "old").unwrap().is_none());
        assert!(store.entity("GlueTable", "new").unwrap().is_some());
        assert_eq!(store.relationships(Some("CONTAINS")).unwrap().len(), 1);
    }

    #[test]
    fn stale_relationships_are_removed_independently() {
        let store = SqliteGraphStore::open_in_memory().unwrap();
        store
            .merge_entity(&ACCOUNT, "000000000000", Attributes::new(), SyncMarker(1))
            .unwrap();
        store.merge_entity(&DB, "db", Attributes::new(), SyncMarker(6)).unwrap();
        let db = NodeRef::new("GlueDatabase", "db");
        store
            .merge_relationship(OWNERSHIP_RELATION, &account(), &db, SyncMarker(5))
            .unwrap();

        let removed = store
            .delete_stale_relationships(
                OWNERSHIP_RELATION,
                "AWSAccount",
                "GlueDatabase",
                &CleanupScope::Account,
                &params(6),
            )
            .unwrap();
        assert_eq!(removed, 1);
        assert!(store.entity("GlueDatabase", "db").unwrap().is_some());
        assert!(store.relationships(None).unwrap().is_empty());
    }
}
