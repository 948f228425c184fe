use super::models::*;
use super::schema::LIBRARY_VERSIONED_SCHEMAS;
use super::trait_def::LibraryStore;
use crate::sqlite_persistence::{open_in_memory, open_versioned};
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

const ENTITY_COLUMNS: &str = "id, kind, source, external_id, title, image_url, created, updated";

/// Raw entity row, parsed into an [`Entity`] outside the rusqlite closure so
/// enum parse failures surface as proper errors instead of column errors.
struct RawEntity {
    id: i64,
    kind: String,
    source: String,
    external_id: String,
    title: Option<String>,
    image_url: Option<String>,
    created: i64,
    updated: i64,
}

impl RawEntity {
    fn read(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(RawEntity {
            id: row.get(0)?,
            kind: row.get(1)?,
            source: row.get(2)?,
            external_id: row.get(3)?,
            title: row.get(4)?,
            image_url: row.get(5)?,
            created: row.get(6)?,
            updated: row.get(7)?,
        })
    }

    fn into_entity(self) -> Result<Entity> {
        Ok(Entity {
            id: self.id,
            kind: EntityKind::parse(&self.kind)
                .with_context(|| format!("Unknown entity kind in database: {}", self.kind))?,
            source: ExternalSource::parse(&self.source)
                .with_context(|| format!("Unknown external source in database: {}", self.source))?,
            external_id: self.external_id,
            title: self.title,
            image_url: self.image_url,
            created_at: self.created,
            updated_at: self.updated,
        })
    }
}

fn parse_vinyl_state(value: Option<String>) -> Result<Option<VinylState>> {
    match value {
        None => Ok(None),
        Some(s) => VinylState::parse(&s)
            .map(Some)
            .with_context(|| format!("Unknown vinyl state in database: {}", s)),
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

#[derive(Clone)]
pub struct SqliteLibraryStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteLibraryStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = open_versioned(db_path, LIBRARY_VERSIONED_SCHEMAS)?;
        Ok(SqliteLibraryStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = open_in_memory(LIBRARY_VERSIONED_SCHEMAS)?;
        Ok(SqliteLibraryStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn find_entity_conn(conn: &Connection, r: &ExternalRef) -> Result<Option<Entity>> {
        let raw = conn
            .query_row(
                &format!(
                    "SELECT {} FROM entities WHERE external_id = ?1 AND source = ?2 AND kind = ?3",
                    ENTITY_COLUMNS
                ),
                params![r.external_id, r.source.as_str(), r.kind.as_str()],
                RawEntity::read,
            )
            .optional()?;
        raw.map(RawEntity::into_entity).transpose()
    }

    /// Inserts the entity row, reporting the expected uniqueness race as
    /// `AlreadyExists` instead of an error. Display fields are written only
    /// here: an existing row keeps whatever was stored first.
    fn insert_entity_conn(conn: &Connection, r: &ExternalRef) -> Result<EntityInsert> {
        let result = conn.execute(
            "INSERT INTO entities (kind, source, external_id, title, image_url)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                r.kind.as_str(),
                r.source.as_str(),
                r.external_id,
                r.title,
                r.image_url
            ],
        );
        match result {
            Ok(_) => {
                let id = conn.last_insert_rowid();
                let entity = Self::get_entity_conn(conn, id)?
                    .context("Entity row missing right after insert")?;
                Ok(EntityInsert::Inserted(entity))
            }
            Err(err) if is_unique_violation(&err) => Ok(EntityInsert::AlreadyExists),
            Err(err) => Err(err).with_context(|| {
                format!(
                    "Failed to insert {} {}:{}",
                    r.kind.as_str(),
                    r.source.as_str(),
                    r.external_id
                )
            }),
        }
    }

    fn get_entity_conn(conn: &Connection, id: i64) -> Result<Option<Entity>> {
        let raw = conn
            .query_row(
                &format!("SELECT {} FROM entities WHERE id = ?1", ENTITY_COLUMNS),
                params![id],
                RawEntity::read,
            )
            .optional()?;
        raw.map(RawEntity::into_entity).transpose()
    }

    /// Find-or-create inside an open transaction: the membership upserts use
    /// this so entity and membership land (or roll back) together.
    fn resolve_entity_conn(conn: &Connection, r: &ExternalRef) -> Result<Entity> {
        if let Some(entity) = Self::find_entity_conn(conn, r)? {
            return Ok(entity);
        }
        match Self::insert_entity_conn(conn, r)? {
            EntityInsert::Inserted(entity) => Ok(entity),
            EntityInsert::AlreadyExists => Self::find_entity_conn(conn, r)?
                .context("Entity row vanished after losing the insert race"),
        }
    }

    fn read_collection(row: &rusqlite::Row) -> rusqlite::Result<Collection> {
        Ok(Collection {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            name: row.get(2)?,
            description: row.get(3)?,
            is_public: row.get::<_, i64>(4)? != 0,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }

    fn get_collection_item_conn(
        conn: &Connection,
        collection_id: i64,
        entity_id: i64,
    ) -> Result<Option<CollectionItem>> {
        let row = conn
            .query_row(
                &format!(
                    "SELECT ci.collection_id, ci.created, ci.updated,
                            ci.state_record, ci.state_cover, ci.acquisition_month_year,
                            {}
                     FROM collection_items ci JOIN entities e ON e.id = ci.entity_id
                     WHERE ci.collection_id = ?1 AND ci.entity_id = ?2",
                    entity_columns_prefixed("e")
                ),
                params![collection_id, entity_id],
                Self::read_collection_item_row,
            )
            .optional()?;
        row.map(Self::finish_collection_item).transpose()
    }

    #[allow(clippy::type_complexity)]
    fn read_collection_item_row(
        row: &rusqlite::Row,
    ) -> rusqlite::Result<(i64, i64, i64, Option<String>, Option<String>, Option<String>, RawEntity)> {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
            RawEntity {
                id: row.get(6)?,
                kind: row.get(7)?,
                source: row.get(8)?,
                external_id: row.get(9)?,
                title: row.get(10)?,
                image_url: row.get(11)?,
                created: row.get(12)?,
                updated: row.get(13)?,
            },
        ))
    }

    fn finish_collection_item(
        raw: (i64, i64, i64, Option<String>, Option<String>, Option<String>, RawEntity),
    ) -> Result<CollectionItem> {
        let (collection_id, created, updated, state_record, state_cover, acquisition, entity) = raw;
        Ok(CollectionItem {
            collection_id,
            entity: entity.into_entity()?,
            state_record: parse_vinyl_state(state_record)?,
            state_cover: parse_vinyl_state(state_cover)?,
            acquisition_month_year: acquisition,
            created_at: created,
            updated_at: updated,
        })
    }

    fn read_wishlist_item_raw(
        row: &rusqlite::Row,
    ) -> rusqlite::Result<(i64, i64, i64, RawEntity)> {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            RawEntity {
                id: row.get(3)?,
                kind: row.get(4)?,
                source: row.get(5)?,
                external_id: row.get(6)?,
                title: row.get(7)?,
                image_url: row.get(8)?,
                created: row.get(9)?,
                updated: row.get(10)?,
            },
        ))
    }

    fn finish_wishlist_item(raw: (i64, i64, i64, RawEntity)) -> Result<WishlistItem> {
        let (id, user_id, created, entity) = raw;
        Ok(WishlistItem {
            id,
            user_id,
            entity: entity.into_entity()?,
            created_at: created,
        })
    }
}

fn entity_columns_prefixed(prefix: &str) -> String {
    ENTITY_COLUMNS
        .split(", ")
        .map(|c| format!("{}.{}", prefix, c))
        .collect::<Vec<_>>()
        .join(", ")
}

const WISHLIST_SELECT: &str = "SELECT w.id, w.user_id, w.created,
        e.id, e.kind, e.source, e.external_id, e.title, e.image_url, e.created, e.updated
 FROM wishlist_items w JOIN entities e ON e.id = w.entity_id";

impl LibraryStore for SqliteLibraryStore {
    fn find_entity(&self, r: &ExternalRef) -> Result<Option<Entity>> {
        let conn = self.conn.lock().unwrap();
        Self::find_entity_conn(&conn, r)
    }

    fn insert_entity(&self, r: &ExternalRef) -> Result<EntityInsert> {
        let conn = self.conn.lock().unwrap();
        Self::insert_entity_conn(&conn, r)
    }

    fn count_entities(&self, kind: EntityKind) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM entities WHERE kind = ?1",
            params![kind.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn create_collection(
        &self,
        owner_id: i64,
        name: &str,
        description: Option<&str>,
        is_public: bool,
    ) -> Result<Collection> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO collections (owner_id, name, description, is_public)
             VALUES (?1, ?2, ?3, ?4)",
            params![owner_id, name, description, is_public as i64],
        )
        .with_context(|| format!("Failed to create collection {}", name))?;
        let id = conn.last_insert_rowid();
        conn.query_row(
            "SELECT id, owner_id, name, description, is_public, created, updated
             FROM collections WHERE id = ?1",
            params![id],
            Self::read_collection,
        )
        .context("Collection row missing right after insert")
    }

    fn get_collection(&self, id: i64) -> Result<Option<Collection>> {
        let conn = self.conn.lock().unwrap();
        Ok(conn
            .query_row(
                "SELECT id, owner_id, name, description, is_public, created, updated
                 FROM collections WHERE id = ?1",
                params![id],
                Self::read_collection,
            )
            .optional()?)
    }

    fn list_user_collections(&self, owner_id: i64) -> Result<Vec<Collection>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, owner_id, name, description, is_public, created, updated
             FROM collections WHERE owner_id = ?1 ORDER BY created DESC, id DESC",
        )?;
        let collections = stmt
            .query_map(params![owner_id], Self::read_collection)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(collections)
    }

    fn list_public_collections(&self) -> Result<Vec<Collection>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, owner_id, name, description, is_public, created, updated
             FROM collections WHERE is_public = 1 ORDER BY updated DESC, id DESC",
        )?;
        let collections = stmt
            .query_map([], Self::read_collection)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(collections)
    }

    fn update_collection(
        &self,
        id: i64,
        name: Option<&str>,
        description: Option<&str>,
        is_public: Option<bool>,
    ) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE collections SET
                name = COALESCE(?2, name),
                description = COALESCE(?3, description),
                is_public = COALESCE(?4, is_public),
                updated = cast(strftime('%s','now') as int)
             WHERE id = ?1",
            params![id, name, description, is_public.map(|b| b as i64)],
        )?;
        Ok(changed > 0)
    }

    fn delete_collection(&self, id: i64) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute("DELETE FROM collections WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }

    fn count_collections(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM collections", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn upsert_collection_item(
        &self,
        collection_id: i64,
        r: &ExternalRef,
        metadata: &CollectionItemMetadata,
    ) -> Result<(CollectionItem, bool)> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let entity = Self::resolve_entity_conn(&tx, r)?;

        let exists: bool = tx
            .query_row(
                "SELECT 1 FROM collection_items WHERE collection_id = ?1 AND entity_id = ?2",
                params![collection_id, entity.id],
                |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);

        if exists {
            // Re-add refreshes the membership timestamp (collections are
            // freshness-tracked for the dashboard) and applies only the
            // metadata fields the caller supplied.
            tx.execute(
                "UPDATE collection_items SET
                    updated = cast(strftime('%s','now') as int),
                    state_record = COALESCE(?3, state_record),
                    state_cover = COALESCE(?4, state_cover),
                    acquisition_month_year = COALESCE(?5, acquisition_month_year)
                 WHERE collection_id = ?1 AND entity_id = ?2",
                params![
                    collection_id,
                    entity.id,
                    metadata.state_record.map(|s| s.as_str()),
                    metadata.state_cover.map(|s| s.as_str()),
                    metadata.acquisition_month_year
                ],
            )?;
        } else {
            tx.execute(
                "INSERT INTO collection_items
                    (collection_id, entity_id, state_record, state_cover, acquisition_month_year)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    collection_id,
                    entity.id,
                    metadata.state_record.map(|s| s.as_str()),
                    metadata.state_cover.map(|s| s.as_str()),
                    metadata.acquisition_month_year
                ],
            )
            .with_context(|| {
                format!(
                    "Failed to add {} {}:{} to collection {}",
                    r.kind.as_str(),
                    r.source.as_str(),
                    r.external_id,
                    collection_id
                )
            })?;
        }

        let item = Self::get_collection_item_conn(&tx, collection_id, entity.id)?
            .context("Membership row missing right after upsert")?;
        tx.commit()?;
        Ok((item, !exists))
    }

    fn remove_collection_item(&self, collection_id: i64, r: &ExternalRef) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let entity = match Self::find_entity_conn(&conn, r)? {
            Some(entity) => entity,
            None => return Ok(false),
        };
        let deleted = conn.execute(
            "DELETE FROM collection_items WHERE collection_id = ?1 AND entity_id = ?2",
            params![collection_id, entity.id],
        )?;
        Ok(deleted > 0)
    }

    fn list_collection_items(
        &self,
        collection_id: i64,
        kind: Option<EntityKind>,
    ) -> Result<Vec<CollectionItem>> {
        let conn = self.conn.lock().unwrap();
        let sql = format!(
            "SELECT ci.collection_id, ci.created, ci.updated,
                    ci.state_record, ci.state_cover, ci.acquisition_month_year,
                    {}
             FROM collection_items ci JOIN entities e ON e.id = ci.entity_id
             WHERE ci.collection_id = ?1 AND (?2 IS NULL OR e.kind = ?2)
             ORDER BY ci.created DESC, e.id DESC",
            entity_columns_prefixed("e")
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(
                params![collection_id, kind.map(|k| k.as_str())],
                Self::read_collection_item_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(Self::finish_collection_item).collect()
    }

    fn latest_public_collection_items(&self, limit: usize) -> Result<Vec<CollectionItem>> {
        let conn = self.conn.lock().unwrap();
        let sql = format!(
            "SELECT ci.collection_id, ci.created, ci.updated,
                    ci.state_record, ci.state_cover, ci.acquisition_month_year,
                    {}
             FROM collection_items ci
             JOIN entities e ON e.id = ci.entity_id
             JOIN collections c ON c.id = ci.collection_id
             WHERE c.is_public = 1
             ORDER BY ci.updated DESC, e.id DESC LIMIT ?1",
            entity_columns_prefixed("e")
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![limit as i64], Self::read_collection_item_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(Self::finish_collection_item).collect()
    }

    fn upsert_wishlist_item(
        &self,
        user_id: i64,
        r: &ExternalRef,
    ) -> Result<(WishlistItem, bool)> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let entity = Self::resolve_entity_conn(&tx, r)?;

        let existing = tx
            .query_row(
                &format!("{} WHERE w.user_id = ?1 AND w.entity_id = ?2", WISHLIST_SELECT),
                params![user_id, entity.id],
                Self::read_wishlist_item_raw,
            )
            .optional()?;

        if let Some(raw) = existing {
            // Wishlist re-add is a pure no-op, the row keeps its timestamp.
            let item = Self::finish_wishlist_item(raw)?;
            tx.commit()?;
            return Ok((item, false));
        }

        tx.execute(
            "INSERT INTO wishlist_items (user_id, entity_id) VALUES (?1, ?2)",
            params![user_id, entity.id],
        )
        .with_context(|| {
            format!(
                "Failed to add {} {}:{} to wishlist of user {}",
                r.kind.as_str(),
                r.source.as_str(),
                r.external_id,
                user_id
            )
        })?;
        let id = tx.last_insert_rowid();
        let raw = tx
            .query_row(
                &format!("{} WHERE w.id = ?1", WISHLIST_SELECT),
                params![id],
                Self::read_wishlist_item_raw,
            )
            .optional()?
            .context("Wishlist row missing right after insert")?;
        let item = Self::finish_wishlist_item(raw)?;
        tx.commit()?;
        Ok((item, true))
    }

    fn get_wishlist_item(&self, id: i64) -> Result<Option<WishlistItem>> {
        let conn = self.conn.lock().unwrap();
        let raw = conn
            .query_row(
                &format!("{} WHERE w.id = ?1", WISHLIST_SELECT),
                params![id],
                Self::read_wishlist_item_raw,
            )
            .optional()?;
        raw.map(Self::finish_wishlist_item).transpose()
    }

    fn delete_wishlist_item(&self, id: i64) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute("DELETE FROM wishlist_items WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }

    fn list_wishlist(&self, user_id: i64) -> Result<Vec<WishlistItem>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "{} WHERE w.user_id = ?1 ORDER BY w.created DESC, w.id DESC",
            WISHLIST_SELECT
        ))?;
        let rows = stmt
            .query_map(params![user_id], Self::read_wishlist_item_raw)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(Self::finish_wishlist_item).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn album_ref(external_id: &str) -> ExternalRef {
        ExternalRef {
            kind: EntityKind::Album,
            source: ExternalSource::Discogs,
            external_id: external_id.to_string(),
            title: Some("OK Computer".to_string()),
            image_url: None,
        }
    }

    #[test]
    fn insert_entity_reports_race_as_already_exists() {
        let store = SqliteLibraryStore::in_memory().unwrap();
        let r = album_ref("123");

        let first = store.insert_entity(&r).unwrap();
        assert!(matches!(first, EntityInsert::Inserted(_)));

        let second = store.insert_entity(&r).unwrap();
        assert!(matches!(second, EntityInsert::AlreadyExists));

        assert_eq!(store.count_entities(EntityKind::Album).unwrap(), 1);
    }

    #[test]
    fn same_external_id_is_distinct_across_kinds_and_sources() {
        let store = SqliteLibraryStore::in_memory().unwrap();
        let album = album_ref("42");
        let artist = ExternalRef {
            kind: EntityKind::Artist,
            ..album.clone()
        };
        let deezer_album = ExternalRef {
            source: ExternalSource::Deezer,
            ..album.clone()
        };

        assert!(matches!(
            store.insert_entity(&album).unwrap(),
            EntityInsert::Inserted(_)
        ));
        assert!(matches!(
            store.insert_entity(&artist).unwrap(),
            EntityInsert::Inserted(_)
        ));
        assert!(matches!(
            store.insert_entity(&deezer_album).unwrap(),
            EntityInsert::Inserted(_)
        ));
    }

    #[test]
    fn entity_display_fields_are_first_write_wins() {
        let store = SqliteLibraryStore::in_memory().unwrap();
        let r = album_ref("9");
        store.insert_entity(&r).unwrap();

        let changed = ExternalRef {
            title: Some("Different title".to_string()),
            ..r.clone()
        };
        store.upsert_wishlist_item(7, &changed).unwrap();

        let found = store.find_entity(&r).unwrap().unwrap();
        assert_eq!(found.title.as_deref(), Some("OK Computer"));
    }

    #[test]
    fn wishlist_readd_is_a_pure_noop() {
        let store = SqliteLibraryStore::in_memory().unwrap();
        let r = album_ref("555");

        let (first, is_new) = store.upsert_wishlist_item(1, &r).unwrap();
        assert!(is_new);

        let (second, is_new) = store.upsert_wishlist_item(1, &r).unwrap();
        assert!(!is_new);
        assert_eq!(second.id, first.id);
        assert_eq!(second.created_at, first.created_at);

        assert_eq!(store.list_wishlist(1).unwrap().len(), 1);
    }

    #[test]
    fn collection_readd_touches_updated_and_applies_metadata() {
        let store = SqliteLibraryStore::in_memory().unwrap();
        let collection = store.create_collection(1, "Shelf", None, false).unwrap();
        let r = album_ref("777");

        let (first, is_new) = store
            .upsert_collection_item(collection.id, &r, &CollectionItemMetadata::default())
            .unwrap();
        assert!(is_new);
        assert!(first.state_record.is_none());

        let metadata = CollectionItemMetadata {
            state_record: Some(VinylState::NearMint),
            state_cover: None,
            acquisition_month_year: Some("2024-03".to_string()),
        };
        let (second, is_new) = store
            .upsert_collection_item(collection.id, &r, &metadata)
            .unwrap();
        assert!(!is_new);
        assert_eq!(second.entity.id, first.entity.id);
        assert_eq!(second.created_at, first.created_at);
        assert!(second.updated_at >= first.updated_at);
        assert_eq!(second.state_record, Some(VinylState::NearMint));
        assert_eq!(second.acquisition_month_year.as_deref(), Some("2024-03"));

        assert_eq!(
            store.list_collection_items(collection.id, None).unwrap().len(),
            1
        );
    }

    #[test]
    fn collection_readd_keeps_metadata_fields_not_supplied() {
        let store = SqliteLibraryStore::in_memory().unwrap();
        let collection = store.create_collection(1, "Shelf", None, false).unwrap();
        let r = album_ref("778");

        let metadata = CollectionItemMetadata {
            state_record: Some(VinylState::Good),
            state_cover: Some(VinylState::Fair),
            acquisition_month_year: None,
        };
        store
            .upsert_collection_item(collection.id, &r, &metadata)
            .unwrap();

        let (item, _) = store
            .upsert_collection_item(collection.id, &r, &CollectionItemMetadata::default())
            .unwrap();
        assert_eq!(item.state_record, Some(VinylState::Good));
        assert_eq!(item.state_cover, Some(VinylState::Fair));
    }

    #[test]
    fn remove_collection_item_is_idempotent() {
        let store = SqliteLibraryStore::in_memory().unwrap();
        let collection = store.create_collection(1, "Shelf", None, false).unwrap();
        let r = album_ref("1");

        assert!(!store.remove_collection_item(collection.id, &r).unwrap());

        store
            .upsert_collection_item(collection.id, &r, &CollectionItemMetadata::default())
            .unwrap();
        assert!(store.remove_collection_item(collection.id, &r).unwrap());
        assert!(!store.remove_collection_item(collection.id, &r).unwrap());
    }

    #[test]
    fn deleting_collection_cascades_memberships_but_keeps_entities() {
        let store = SqliteLibraryStore::in_memory().unwrap();
        let collection = store.create_collection(1, "Shelf", None, false).unwrap();
        let r = album_ref("31");
        store
            .upsert_collection_item(collection.id, &r, &CollectionItemMetadata::default())
            .unwrap();

        assert!(store.delete_collection(collection.id).unwrap());
        assert_eq!(store.count_entities(EntityKind::Album).unwrap(), 1);
        assert!(store.get_collection(collection.id).unwrap().is_none());
    }

    #[test]
    fn latest_public_items_exclude_private_collections() {
        let store = SqliteLibraryStore::in_memory().unwrap();
        let private = store.create_collection(1, "Private", None, false).unwrap();
        let public = store.create_collection(2, "Public", None, true).unwrap();
        store
            .upsert_collection_item(private.id, &album_ref("100"), &Default::default())
            .unwrap();
        store
            .upsert_collection_item(public.id, &album_ref("200"), &Default::default())
            .unwrap();

        let latest = store.latest_public_collection_items(10).unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].entity.external_id, "200");
    }

    #[test]
    fn concurrent_resolution_converges_to_one_row() {
        let store = Arc::new(SqliteLibraryStore::in_memory().unwrap());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(std::thread::spawn(move || {
                let r = ExternalRef {
                    kind: EntityKind::Artist,
                    source: ExternalSource::Musicbrainz,
                    external_id: "77".to_string(),
                    title: Some("Radiohead".to_string()),
                    image_url: None,
                };
                match store.insert_entity(&r).unwrap() {
                    EntityInsert::Inserted(entity) => entity.id,
                    EntityInsert::AlreadyExists => store.find_entity(&r).unwrap().unwrap().id,
                }
            }));
        }
        let ids: Vec<i64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(ids.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(store.count_entities(EntityKind::Artist).unwrap(), 1);
    }
}
