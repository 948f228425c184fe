//! SQLite schema for the library database: shared entity rows plus the
//! per-user wishlist and per-collection membership tables.

use crate::db_column;
use crate::sqlite_persistence::{SqlType, Table, VersionedSchema, UNIX_NOW};

/// V 0
const ENTITIES_TABLE_V0: Table = Table {
    name: "entities",
    columns: &[
        db_column!("id", SqlType::Integer, primary_key = true),
        db_column!("kind", SqlType::Text, not_null = true),
        db_column!("source", SqlType::Text, not_null = true),
        db_column!("external_id", SqlType::Text, not_null = true),
        db_column!("title", SqlType::Text),
        db_column!("image_url", SqlType::Text),
        db_column!("created", SqlType::Integer, not_null = true, default = Some(UNIX_NOW)),
        db_column!("updated", SqlType::Integer, not_null = true, default = Some(UNIX_NOW)),
    ],
    indices: &[],
    // One local row per provider id, per provider, per kind. The race-safe
    // resolve path relies on this constraint.
    unique: &[&["external_id", "source", "kind"]],
};

const COLLECTIONS_TABLE_V0: Table = Table {
    name: "collections",
    columns: &[
        db_column!("id", SqlType::Integer, primary_key = true),
        db_column!("owner_id", SqlType::Integer, not_null = true),
        db_column!("name", SqlType::Text, not_null = true),
        db_column!("description", SqlType::Text),
        db_column!("is_public", SqlType::Integer, not_null = true),
        db_column!("created", SqlType::Integer, not_null = true, default = Some(UNIX_NOW)),
        db_column!("updated", SqlType::Integer, not_null = true, default = Some(UNIX_NOW)),
    ],
    indices: &[("idx_collections_owner", "owner_id")],
    unique: &[],
};

const COLLECTION_ITEMS_TABLE_V0: Table = Table {
    name: "collection_items",
    columns: &[
        db_column!(
            "collection_id",
            SqlType::Integer,
            not_null = true,
            references = Some(("collections", "id"))
        ),
        db_column!(
            "entity_id",
            SqlType::Integer,
            not_null = true,
            references = Some(("entities", "id"))
        ),
        db_column!("created", SqlType::Integer, not_null = true, default = Some(UNIX_NOW)),
        db_column!("updated", SqlType::Integer, not_null = true, default = Some(UNIX_NOW)),
    ],
    indices: &[("idx_collection_items_collection", "collection_id")],
    unique: &[&["collection_id", "entity_id"]],
};

const WISHLIST_ITEMS_TABLE_V0: Table = Table {
    name: "wishlist_items",
    columns: &[
        db_column!("id", SqlType::Integer, primary_key = true),
        db_column!("user_id", SqlType::Integer, not_null = true),
        db_column!(
            "entity_id",
            SqlType::Integer,
            not_null = true,
            references = Some(("entities", "id"))
        ),
        db_column!("created", SqlType::Integer, not_null = true, default = Some(UNIX_NOW)),
    ],
    indices: &[("idx_wishlist_items_user", "user_id")],
    unique: &[&["user_id", "entity_id"]],
};

/// V 1 adds record/cover condition and acquisition month to memberships.
const COLLECTION_ITEMS_TABLE_V1: Table = Table {
    name: "collection_items",
    columns: &[
        db_column!(
            "collection_id",
            SqlType::Integer,
            not_null = true,
            references = Some(("collections", "id"))
        ),
        db_column!(
            "entity_id",
            SqlType::Integer,
            not_null = true,
            references = Some(("entities", "id"))
        ),
        db_column!("created", SqlType::Integer, not_null = true, default = Some(UNIX_NOW)),
        db_column!("updated", SqlType::Integer, not_null = true, default = Some(UNIX_NOW)),
        db_column!("state_record", SqlType::Text),
        db_column!("state_cover", SqlType::Text),
        db_column!("acquisition_month_year", SqlType::Text),
    ],
    indices: &[("idx_collection_items_collection", "collection_id")],
    unique: &[&["collection_id", "entity_id"]],
};

pub const LIBRARY_VERSIONED_SCHEMAS: &[VersionedSchema] = &[
    VersionedSchema {
        version: 0,
        tables: &[
            ENTITIES_TABLE_V0,
            COLLECTIONS_TABLE_V0,
            COLLECTION_ITEMS_TABLE_V0,
            WISHLIST_ITEMS_TABLE_V0,
        ],
        migration: None,
    },
    VersionedSchema {
        version: 1,
        tables: &[
            ENTITIES_TABLE_V0,
            COLLECTIONS_TABLE_V0,
            COLLECTION_ITEMS_TABLE_V1,
            WISHLIST_ITEMS_TABLE_V0,
        ],
        migration: Some(|conn| {
            conn.execute("ALTER TABLE collection_items ADD COLUMN state_record TEXT", [])?;
            conn.execute("ALTER TABLE collection_items ADD COLUMN state_cover TEXT", [])?;
            conn.execute(
                "ALTER TABLE collection_items ADD COLUMN acquisition_month_year TEXT",
                [],
            )?;
            Ok(())
        }),
    },
];
