//! Declarative SQLite schema definitions shared by all stores.
//!
//! Each store declares its tables as consts and bundles them into a list of
//! [`VersionedSchema`]s. On open, a fresh database is created from the latest
//! schema; an existing database is validated against the schema matching its
//! recorded version and then migrated forward.

use anyhow::{bail, Context, Result};
use rusqlite::Connection;

/// SQL expression for a unix-seconds creation timestamp.
pub const UNIX_NOW: &str = "(cast(strftime('%s','now') as int))";

/// Database versions are offset so that an unrelated SQLite file (whose
/// `user_version` defaults to 0) is rejected instead of being "migrated".
pub const DB_VERSION_BASE: i64 = 77000;

#[macro_export]
macro_rules! db_column {
    ($name:expr, $sql_type:expr $(, $field:ident = $value:expr)*) => {{
        #[allow(unused_mut)]
        let mut column = $crate::sqlite_persistence::Column {
            name: $name,
            sql_type: $sql_type,
            primary_key: false,
            not_null: false,
            default: None,
            references: None,
        };
        $(column.$field = $value;)*
        column
    }};
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Text,
    Integer,
    Real,
}

impl SqlType {
    fn as_sql(self) -> &'static str {
        match self {
            SqlType::Text => "TEXT",
            SqlType::Integer => "INTEGER",
            SqlType::Real => "REAL",
        }
    }
}

pub struct Column {
    pub name: &'static str,
    pub sql_type: SqlType,
    pub primary_key: bool,
    pub not_null: bool,
    pub default: Option<&'static str>,
    /// `(table, column)`; all foreign keys in this schema cascade on delete.
    pub references: Option<(&'static str, &'static str)>,
}

pub struct Table {
    pub name: &'static str,
    pub columns: &'static [Column],
    /// `(index_name, column_list)` pairs.
    pub indices: &'static [(&'static str, &'static str)],
    /// Each entry is the column list of one `UNIQUE (...)` constraint.
    pub unique: &'static [&'static [&'static str]],
}

impl Table {
    pub fn create(&self, conn: &Connection) -> Result<()> {
        let mut parts: Vec<String> = self
            .columns
            .iter()
            .map(|c| {
                let mut def = format!("{} {}", c.name, c.sql_type.as_sql());
                if c.primary_key {
                    def.push_str(" PRIMARY KEY");
                }
                if c.not_null {
                    def.push_str(" NOT NULL");
                }
                if let Some(default) = c.default {
                    def.push_str(&format!(" DEFAULT {}", default));
                }
                if let Some((table, column)) = c.references {
                    def.push_str(&format!(
                        " REFERENCES {}({}) ON DELETE CASCADE",
                        table, column
                    ));
                }
                def
            })
            .collect();
        for columns in self.unique {
            parts.push(format!("UNIQUE ({})", columns.join(", ")));
        }

        conn.execute(
            &format!("CREATE TABLE {} ({})", self.name, parts.join(", ")),
            [],
        )
        .with_context(|| format!("Failed to create table {}", self.name))?;

        for (index_name, columns) in self.indices {
            conn.execute(
                &format!("CREATE INDEX {} ON {}({})", index_name, self.name, columns),
                [],
            )
            .with_context(|| format!("Failed to create index {}", index_name))?;
        }
        Ok(())
    }

    /// Checks that the live table matches this declaration: column names,
    /// types, nullability and primary keys via `PRAGMA table_info`, plus the
    /// presence of every declared unique constraint and index.
    pub fn validate(&self, conn: &Connection) -> Result<()> {
        struct LiveColumn {
            name: String,
            sql_type: String,
            not_null: bool,
            primary_key: bool,
        }

        let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", self.name))?;
        let live: Vec<LiveColumn> = stmt
            .query_map([], |row| {
                Ok(LiveColumn {
                    name: row.get(1)?,
                    sql_type: row.get(2)?,
                    not_null: row.get::<_, i32>(3)? != 0,
                    primary_key: row.get::<_, i32>(5)? != 0,
                })
            })?
            .collect::<Result<_, _>>()?;

        if live.len() != self.columns.len() {
            bail!(
                "Table {}: expected {} columns, found {} ({})",
                self.name,
                self.columns.len(),
                live.len(),
                live.iter()
                    .map(|c| c.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
        for (actual, expected) in live.iter().zip(self.columns.iter()) {
            if actual.name != expected.name {
                bail!(
                    "Table {}: expected column {}, found {}",
                    self.name,
                    expected.name,
                    actual.name
                );
            }
            if actual.sql_type != expected.sql_type.as_sql() {
                bail!(
                    "Table {} column {}: expected type {}, found {}",
                    self.name,
                    expected.name,
                    expected.sql_type.as_sql(),
                    actual.sql_type
                );
            }
            if actual.not_null != expected.not_null {
                bail!(
                    "Table {} column {}: NOT NULL mismatch",
                    self.name,
                    expected.name
                );
            }
            if actual.primary_key != expected.primary_key {
                bail!(
                    "Table {} column {}: PRIMARY KEY mismatch",
                    self.name,
                    expected.name
                );
            }
        }

        // Unique constraints surface as unique indices in PRAGMA index_list.
        let mut stmt = conn.prepare(&format!("PRAGMA index_list({})", self.name))?;
        let unique_indices: Vec<String> = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(1)?, row.get::<_, i32>(2)?))
            })?
            .filter_map(|r| r.ok())
            .filter(|(_, is_unique)| *is_unique == 1)
            .map(|(name, _)| name)
            .collect();
        let mut unique_column_sets: Vec<Vec<String>> = Vec::new();
        for index_name in &unique_indices {
            let mut stmt = conn.prepare(&format!("PRAGMA index_info({})", index_name))?;
            let mut columns: Vec<String> = stmt
                .query_map([], |row| row.get::<_, String>(2))?
                .filter_map(|r| r.ok())
                .collect();
            columns.sort();
            unique_column_sets.push(columns);
        }
        for expected in self.unique {
            let mut wanted: Vec<String> = expected.iter().map(|s| s.to_string()).collect();
            wanted.sort();
            if !unique_column_sets.contains(&wanted) {
                bail!(
                    "Table {}: missing unique constraint on ({})",
                    self.name,
                    expected.join(", ")
                );
            }
        }

        for (index_name, _) in self.indices {
            let found: bool = conn
                .query_row(
                    "SELECT 1 FROM sqlite_master WHERE type = 'index' AND name = ?1 AND tbl_name = ?2",
                    rusqlite::params![index_name, self.name],
                    |_| Ok(true),
                )
                .unwrap_or(false);
            if !found {
                bail!("Table {}: missing index {}", self.name, index_name);
            }
        }

        Ok(())
    }
}

pub struct VersionedSchema {
    pub version: usize,
    pub tables: &'static [Table],
    pub migration: Option<fn(&Connection) -> Result<()>>,
}

impl VersionedSchema {
    pub fn create(&self, conn: &Connection) -> Result<()> {
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        for table in self.tables {
            table.create(conn)?;
        }
        set_db_version(conn, self.version)?;
        Ok(())
    }

    pub fn validate(&self, conn: &Connection) -> Result<()> {
        for table in self.tables {
            table.validate(conn)?;
        }
        Ok(())
    }
}

fn set_db_version(conn: &Connection, version: usize) -> Result<()> {
    conn.execute(
        &format!("PRAGMA user_version = {}", DB_VERSION_BASE + version as i64),
        [],
    )?;
    Ok(())
}

/// Opens (or creates) a store database, validating and migrating as needed.
///
/// A fresh database is created from the last entry of `schemas`. An existing
/// one must carry a known version; it is validated against that version's
/// declaration and then every later migration runs in order inside one
/// transaction.
pub fn open_versioned<P: AsRef<std::path::Path>>(
    db_path: P,
    schemas: &'static [VersionedSchema],
) -> Result<Connection> {
    let path = db_path.as_ref();
    let latest = schemas
        .last()
        .context("Versioned schema list must not be empty")?;

    if !path.exists() && path.to_str() != Some(":memory:") {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to create database at {:?}", path))?;
        latest.create(&conn)?;
        return Ok(conn);
    }

    let mut conn = Connection::open(path)
        .with_context(|| format!("Failed to open database at {:?}", path))?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    if path.to_str() == Some(":memory:") {
        latest.create(&conn)?;
        return Ok(conn);
    }

    let raw_version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    let version = raw_version - DB_VERSION_BASE;
    if version < 0 || version as usize >= schemas.len() {
        bail!(
            "Database at {:?} has unknown version {} (raw {})",
            path,
            version,
            raw_version
        );
    }
    let version = version as usize;
    schemas[version]
        .validate(&conn)
        .with_context(|| format!("Schema validation failed for database {:?}", path))?;

    if version < latest.version {
        let tx = conn.transaction()?;
        for schema in schemas.iter().filter(|s| s.version > version) {
            tracing::info!("Migrating {:?} to schema version {}", path, schema.version);
            if let Some(migration) = schema.migration {
                migration(&tx)?;
            }
        }
        set_db_version(&tx, latest.version)?;
        tx.commit()?;
    }

    Ok(conn)
}

pub fn open_in_memory(schemas: &'static [VersionedSchema]) -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    schemas
        .last()
        .context("Versioned schema list must not be empty")?
        .create(&conn)?;
    Ok(conn)
}
