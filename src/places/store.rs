use super::models::{ModerationStatus, NewPlace, Place, PlaceKind};
use crate::db_column;
use crate::sqlite_persistence::{
    open_in_memory, open_versioned, SqlType, Table, VersionedSchema, UNIX_NOW,
};
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// V 0
const PLACES_TABLE_V0: Table = Table {
    name: "places",
    columns: &[
        db_column!("id", SqlType::Integer, primary_key = true),
        db_column!("submitted_by", SqlType::Integer, not_null = true),
        db_column!("name", SqlType::Text, not_null = true),
        db_column!("description", SqlType::Text),
        db_column!("city", SqlType::Text),
        db_column!("country", SqlType::Text),
        db_column!("latitude", SqlType::Real, not_null = true),
        db_column!("longitude", SqlType::Real, not_null = true),
        db_column!("kind", SqlType::Text, not_null = true),
        db_column!("status", SqlType::Text, not_null = true, default = Some("'pending'")),
        db_column!("created", SqlType::Integer, not_null = true, default = Some(UNIX_NOW)),
    ],
    indices: &[("idx_places_status", "status")],
    unique: &[],
};

const PLACE_LIKES_TABLE_V0: Table = Table {
    name: "place_likes",
    columns: &[
        db_column!(
            "place_id",
            SqlType::Integer,
            not_null = true,
            references = Some(("places", "id"))
        ),
        db_column!("user_id", SqlType::Integer, not_null = true),
        db_column!("created", SqlType::Integer, not_null = true, default = Some(UNIX_NOW)),
    ],
    indices: &[],
    unique: &[&["place_id", "user_id"]],
};

pub const PLACE_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[PLACES_TABLE_V0, PLACE_LIKES_TABLE_V0],
    migration: None,
}];

const PLACE_SELECT: &str = "SELECT p.id, p.submitted_by, p.name, p.description, p.city,
        p.country, p.latitude, p.longitude, p.kind, p.status, p.created,
        (SELECT COUNT(*) FROM place_likes l WHERE l.place_id = p.id)
 FROM places p";

pub trait PlaceStore: Send + Sync {
    fn create_place(&self, submitted_by: i64, place: &NewPlace) -> Result<Place>;

    fn get_place(&self, id: i64) -> Result<Option<Place>>;

    fn list_places_by_status(&self, status: ModerationStatus) -> Result<Vec<Place>>;

    fn list_user_places(&self, submitted_by: i64) -> Result<Vec<Place>>;

    /// Returns false if the place does not exist.
    fn set_place_status(&self, id: i64, status: ModerationStatus) -> Result<bool>;

    fn delete_place(&self, id: i64) -> Result<bool>;

    fn count_places_by_status(&self, status: ModerationStatus) -> Result<usize>;

    /// Returns true if the like was newly recorded, false if it already was.
    fn like_place(&self, place_id: i64, user_id: i64) -> Result<bool>;

    fn unlike_place(&self, place_id: i64, user_id: i64) -> Result<bool>;

    fn is_place_liked(&self, place_id: i64, user_id: i64) -> Result<bool>;
}

#[derive(Clone)]
pub struct SqlitePlaceStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqlitePlaceStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = open_versioned(db_path, PLACE_VERSIONED_SCHEMAS)?;
        Ok(SqlitePlaceStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = open_in_memory(PLACE_VERSIONED_SCHEMAS)?;
        Ok(SqlitePlaceStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    #[allow(clippy::type_complexity)]
    fn read_place_raw(
        row: &rusqlite::Row,
    ) -> rusqlite::Result<(
        i64,
        i64,
        String,
        Option<String>,
        Option<String>,
        Option<String>,
        f64,
        f64,
        String,
        String,
        i64,
        i64,
    )> {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
            row.get(6)?,
            row.get(7)?,
            row.get(8)?,
            row.get(9)?,
            row.get(10)?,
            row.get(11)?,
        ))
    }

    #[allow(clippy::type_complexity)]
    fn finish_place(
        raw: (
            i64,
            i64,
            String,
            Option<String>,
            Option<String>,
            Option<String>,
            f64,
            f64,
            String,
            String,
            i64,
            i64,
        ),
    ) -> Result<Place> {
        let (id, submitted_by, name, description, city, country, latitude, longitude, kind, status, created, likes) =
            raw;
        Ok(Place {
            id,
            submitted_by,
            name,
            description,
            city,
            country,
            latitude,
            longitude,
            kind: PlaceKind::parse(&kind)
                .with_context(|| format!("Unknown place kind in database: {}", kind))?,
            status: ModerationStatus::parse(&status)
                .with_context(|| format!("Unknown moderation status in database: {}", status))?,
            likes,
            created_at: created,
        })
    }
}

impl PlaceStore for SqlitePlaceStore {
    fn create_place(&self, submitted_by: i64, place: &NewPlace) -> Result<Place> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO places
                (submitted_by, name, description, city, country, latitude, longitude, kind)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                submitted_by,
                place.name,
                place.description,
                place.city,
                place.country,
                place.latitude,
                place.longitude,
                place.kind.as_str()
            ],
        )
        .with_context(|| format!("Failed to create place {}", place.name))?;
        let id = conn.last_insert_rowid();
        let raw = conn
            .query_row(
                &format!("{} WHERE p.id = ?1", PLACE_SELECT),
                params![id],
                Self::read_place_raw,
            )
            .optional()?
            .context("Place row missing right after insert")?;
        Self::finish_place(raw)
    }

    fn get_place(&self, id: i64) -> Result<Option<Place>> {
        let conn = self.conn.lock().unwrap();
        let raw = conn
            .query_row(
                &format!("{} WHERE p.id = ?1", PLACE_SELECT),
                params![id],
                Self::read_place_raw,
            )
            .optional()?;
        raw.map(Self::finish_place).transpose()
    }

    fn list_places_by_status(&self, status: ModerationStatus) -> Result<Vec<Place>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "{} WHERE p.status = ?1 ORDER BY p.created DESC, p.id DESC",
            PLACE_SELECT
        ))?;
        let rows = stmt
            .query_map(params![status.as_str()], Self::read_place_raw)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(Self::finish_place).collect()
    }

    fn list_user_places(&self, submitted_by: i64) -> Result<Vec<Place>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "{} WHERE p.submitted_by = ?1 ORDER BY p.created DESC, p.id DESC",
            PLACE_SELECT
        ))?;
        let rows = stmt
            .query_map(params![submitted_by], Self::read_place_raw)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(Self::finish_place).collect()
    }

    fn set_place_status(&self, id: i64, status: ModerationStatus) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE places SET status = ?2 WHERE id = ?1",
            params![id, status.as_str()],
        )?;
        Ok(changed > 0)
    }

    fn delete_place(&self, id: i64) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute("DELETE FROM places WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }

    fn count_places_by_status(&self, status: ModerationStatus) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM places WHERE status = ?1",
            params![status.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn like_place(&self, place_id: i64, user_id: i64) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO place_likes (place_id, user_id) VALUES (?1, ?2)",
            params![place_id, user_id],
        )?;
        Ok(inserted > 0)
    }

    fn unlike_place(&self, place_id: i64, user_id: i64) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            "DELETE FROM place_likes WHERE place_id = ?1 AND user_id = ?2",
            params![place_id, user_id],
        )?;
        Ok(deleted > 0)
    }

    fn is_place_liked(&self, place_id: i64, user_id: i64) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let liked = conn
            .query_row(
                "SELECT 1 FROM place_likes WHERE place_id = ?1 AND user_id = ?2",
                params![place_id, user_id],
                |_| Ok(true),
            )
            .optional()?;
        Ok(liked.unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_place(name: &str) -> NewPlace {
        NewPlace {
            name: name.to_string(),
            description: None,
            city: Some("Torino".to_string()),
            country: Some("Italy".to_string()),
            latitude: 45.07,
            longitude: 7.68,
            kind: PlaceKind::Shop,
        }
    }

    #[test]
    fn new_places_start_pending() {
        let store = SqlitePlaceStore::in_memory().unwrap();
        let place = store.create_place(1, &new_place("Dig Records")).unwrap();
        assert_eq!(place.status, ModerationStatus::Pending);
        assert_eq!(place.likes, 0);
        assert_eq!(store.count_places_by_status(ModerationStatus::Pending).unwrap(), 1);
        assert_eq!(store.count_places_by_status(ModerationStatus::Approved).unwrap(), 0);
    }

    #[test]
    fn status_flips_move_places_between_lists() {
        let store = SqlitePlaceStore::in_memory().unwrap();
        let place = store.create_place(1, &new_place("Dig Records")).unwrap();

        assert!(store.set_place_status(place.id, ModerationStatus::Approved).unwrap());
        assert!(store.list_places_by_status(ModerationStatus::Pending).unwrap().is_empty());
        assert_eq!(
            store.list_places_by_status(ModerationStatus::Approved).unwrap()[0].id,
            place.id
        );

        assert!(!store.set_place_status(999, ModerationStatus::Approved).unwrap());
    }

    #[test]
    fn likes_are_idempotent_per_user() {
        let store = SqlitePlaceStore::in_memory().unwrap();
        let place = store.create_place(1, &new_place("Dig Records")).unwrap();

        assert!(store.like_place(place.id, 7).unwrap());
        assert!(!store.like_place(place.id, 7).unwrap());
        assert!(store.like_place(place.id, 8).unwrap());
        assert_eq!(store.get_place(place.id).unwrap().unwrap().likes, 2);

        assert!(store.unlike_place(place.id, 7).unwrap());
        assert!(!store.unlike_place(place.id, 7).unwrap());
        assert_eq!(store.get_place(place.id).unwrap().unwrap().likes, 1);
        assert!(store.is_place_liked(place.id, 8).unwrap());
        assert!(!store.is_place_liked(place.id, 7).unwrap());
    }

    #[test]
    fn deleting_a_place_cascades_its_likes() {
        let store = SqlitePlaceStore::in_memory().unwrap();
        let place = store.create_place(1, &new_place("Dig Records")).unwrap();
        store.like_place(place.id, 7).unwrap();

        assert!(store.delete_place(place.id).unwrap());
        assert!(store.get_place(place.id).unwrap().is_none());
        assert!(!store.unlike_place(place.id, 7).unwrap());
    }
}
