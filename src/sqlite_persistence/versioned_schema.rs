use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection, OpenFlags};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub const DEFAULT_TIMESTAMP: &str = "(cast(strftime('%s','now') as int))";

/// Offset added to the schema version stored in `PRAGMA user_version`, so that a
/// foreign SQLite file (user_version 0) is never mistaken for one of ours.
pub const BASE_DB_VERSION: usize = 7000;

/// How long a writer waits for the database lock before giving up.
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[macro_export]
macro_rules! sqlite_column {
    ($name:expr, $sql_type:expr $(, $field:ident = $value:expr)*) => {
        {
            #[allow(unused_mut)]
            let mut column = Column {
                name: $name,
                sql_type: $sql_type,
                is_primary_key: false,
                non_null: false,
                is_unique: false,
                default_value: None,
                foreign_key: None,
            };
            $(
                column.$field = $value;
            )*
            column
        }
    };
}

#[derive(Debug, PartialEq, Eq)]
pub enum SqlType {
    Text,
    Integer,
    Real,
}

impl SqlType {
    fn as_sql(&self) -> &'static str {
        match self {
            SqlType::Text => "TEXT",
            SqlType::Integer => "INTEGER",
            SqlType::Real => "REAL",
        }
    }

    fn from_sql(s: &str) -> Option<&'static SqlType> {
        match s {
            "TEXT" => Some(&SqlType::Text),
            "INTEGER" => Some(&SqlType::Integer),
            "REAL" => Some(&SqlType::Real),
            _ => None,
        }
    }
}

#[allow(unused)]
pub enum ForeignKeyOnChange {
    NoAction,
    Restrict,
    Cascade,
}

impl ForeignKeyOnChange {
    fn as_sql(&self) -> &'static str {
        match self {
            ForeignKeyOnChange::NoAction => "NO ACTION",
            ForeignKeyOnChange::Restrict => "RESTRICT",
            ForeignKeyOnChange::Cascade => "CASCADE",
        }
    }
}

pub struct ForeignKey {
    pub foreign_table: &'static str,
    pub foreign_column: &'static str,
    pub on_delete: ForeignKeyOnChange,
}

pub struct Column {
    pub name: &'static str,
    pub sql_type: &'static SqlType,
    pub is_primary_key: bool,
    pub non_null: bool,
    pub is_unique: bool,
    pub default_value: Option<&'static str>,
    pub foreign_key: Option<&'static ForeignKey>,
}

/// A unique index restricted to the rows matching `predicate`.
pub struct PartialUniqueIndex {
    pub name: &'static str,
    pub columns: &'static [&'static str],
    pub predicate: &'static str,
}

pub struct Table {
    pub name: &'static str,
    pub columns: &'static [Column],
    pub indices: &'static [(&'static str, &'static str)],
    pub unique_constraints: &'static [&'static [&'static str]],
    pub partial_unique_indices: &'static [PartialUniqueIndex],
}

impl Table {
    fn create_sql(&self) -> String {
        let mut definitions: Vec<String> = self
            .columns
            .iter()
            .map(|column| {
                let mut def = format!("{} {}", column.name, column.sql_type.as_sql());
                if column.is_primary_key {
                    def.push_str(" PRIMARY KEY");
                }
                if column.non_null {
                    def.push_str(" NOT NULL");
                }
                if column.is_unique {
                    def.push_str(" UNIQUE");
                }
                if let Some(default_value) = column.default_value {
                    def.push_str(&format!(" DEFAULT {}", default_value));
                }
                if let Some(fk) = column.foreign_key {
                    def.push_str(&format!(
                        " REFERENCES {}({}) ON DELETE {}",
                        fk.foreign_table,
                        fk.foreign_column,
                        fk.on_delete.as_sql()
                    ));
                }
                def
            })
            .collect();

        for unique_constraint in self.unique_constraints {
            definitions.push(format!("UNIQUE ({})", unique_constraint.join(", ")));
        }

        format!("CREATE TABLE {} ({});", self.name, definitions.join(", "))
    }

    pub fn create(&self, conn: &Connection) -> Result<()> {
        conn.execute(&self.create_sql(), params![])
            .with_context(|| format!("Failed to create table {}", self.name))?;

        for (index_name, column_name) in self.indices {
            conn.execute(
                &format!(
                    "CREATE INDEX {} ON {}({});",
                    index_name, self.name, column_name
                ),
                params![],
            )?;
        }
        for index in self.partial_unique_indices {
            conn.execute(
                &format!(
                    "CREATE UNIQUE INDEX {} ON {}({}) WHERE {};",
                    index.name,
                    self.name,
                    index.columns.join(", "),
                    index.predicate
                ),
                params![],
            )?;
        }
        Ok(())
    }

    fn index_exists(&self, conn: &Connection, index_name: &str) -> bool {
        conn.query_row(
            "SELECT 1 FROM sqlite_master WHERE type='index' AND name=?1 AND tbl_name=?2",
            params![index_name, self.name],
            |_| Ok(true),
        )
        .unwrap_or(false)
    }

    fn validate(&self, conn: &Connection) -> Result<()> {
        struct ActualColumn {
            name: String,
            sql_type: String,
            non_null: bool,
            is_primary_key: bool,
        }

        let mut stmt = conn.prepare(&format!("PRAGMA table_info({});", self.name))?;
        let actual_columns = stmt
            .query_map(params![], |row| {
                Ok(ActualColumn {
                    name: row.get(1)?,
                    sql_type: row.get(2)?,
                    non_null: row.get::<_, i32>(3)? == 1,
                    is_primary_key: row.get::<_, i32>(5)? == 1,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        if actual_columns.len() != self.columns.len() {
            bail!(
                "Table {} has {} columns, expected {}. Found: {}",
                self.name,
                actual_columns.len(),
                self.columns.len(),
                actual_columns
                    .iter()
                    .map(|c| c.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }

        for (actual, expected) in actual_columns.iter().zip(self.columns.iter()) {
            if actual.name != expected.name {
                bail!(
                    "Table {} column name mismatch: expected {}, got {}",
                    self.name,
                    expected.name,
                    actual.name
                );
            }
            if SqlType::from_sql(&actual.sql_type) != Some(expected.sql_type) {
                bail!(
                    "Table {} column {} type mismatch: expected {:?}, got {}",
                    self.name,
                    expected.name,
                    expected.sql_type,
                    actual.sql_type
                );
            }
            if actual.non_null != expected.non_null {
                bail!(
                    "Table {} column {} non-null mismatch: expected {}, got {}",
                    self.name,
                    expected.name,
                    expected.non_null,
                    actual.non_null
                );
            }
            if actual.is_primary_key != expected.is_primary_key {
                bail!(
                    "Table {} column {} primary key mismatch: expected {}, got {}",
                    self.name,
                    expected.name,
                    expected.is_primary_key,
                    actual.is_primary_key
                );
            }
        }

        let expected_indices = self
            .indices
            .iter()
            .map(|(name, _)| *name)
            .chain(self.partial_unique_indices.iter().map(|i| i.name));
        for index_name in expected_indices {
            if !self.index_exists(conn, index_name) {
                bail!("Table {} is missing index '{}'", self.name, index_name);
            }
        }

        if !self.unique_constraints.is_empty() {
            // Table-level UNIQUE constraints show up as auto-indices in PRAGMA index_list.
            let mut stmt = conn.prepare(&format!("PRAGMA index_list({})", self.name))?;
            let unique_indices: Vec<String> = stmt
                .query_map([], |row| Ok((row.get::<_, String>(1)?, row.get::<_, i32>(2)?)))?
                .filter_map(|r| r.ok())
                .filter(|(_, unique)| *unique == 1)
                .map(|(name, _)| name)
                .collect();

            let mut unique_column_sets: Vec<Vec<String>> = Vec::new();
            for index_name in &unique_indices {
                let mut idx_stmt = conn.prepare(&format!("PRAGMA index_info({})", index_name))?;
                let mut cols: Vec<String> = idx_stmt
                    .query_map([], |row| row.get::<_, String>(2))?
                    .filter_map(|r| r.ok())
                    .collect();
                cols.sort();
                unique_column_sets.push(cols);
            }

            for expected in self.unique_constraints {
                let mut expected_sorted: Vec<&str> = expected.to_vec();
                expected_sorted.sort();
                let found = unique_column_sets
                    .iter()
                    .any(|cols| cols.iter().map(String::as_str).eq(expected_sorted.iter().copied()));
                if !found {
                    bail!(
                        "Table {} is missing unique constraint on columns ({})",
                        self.name,
                        expected.join(", ")
                    );
                }
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
        for table in self.tables {
            table.create(conn)?;
        }
        conn.execute(
            &format!("PRAGMA user_version = {}", BASE_DB_VERSION + self.version),
            [],
        )?;
        Ok(())
    }

    pub fn validate(&self, conn: &Connection) -> Result<()> {
        for table in self.tables {
            table.validate(conn)?;
        }
        Ok(())
    }
}

fn configure_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    Ok(())
}

fn migrate_if_needed(conn: &Connection, schemas: &[VersionedSchema], version: usize) -> Result<()> {
    let mut latest_from = version;
    for schema in schemas.iter().skip(version + 1) {
        if let Some(migration_fn) = schema.migration {
            info!(
                "Migrating db from version {} to {}",
                latest_from, schema.version
            );
            migration_fn(conn)?;
        }
        latest_from = schema.version;
    }
    conn.execute(
        &format!("PRAGMA user_version = {}", BASE_DB_VERSION + latest_from),
        [],
    )?;
    Ok(())
}

/// Opens (or creates) a SQLite database governed by `schemas`.
///
/// A new file gets the latest schema. An existing file has its stored version
/// validated against the matching schema and is then migrated forward one
/// version at a time.
pub fn open_versioned_db<P: AsRef<Path>>(
    db_path: P,
    schemas: &[VersionedSchema],
) -> Result<Connection> {
    let latest = schemas.last().context("No schema versions defined")?;
    let db_path = db_path.as_ref();

    let conn = if db_path.exists() {
        Connection::open_with_flags(
            db_path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?
    } else {
        info!("Creating new database at {:?}", db_path);
        let conn = Connection::open(db_path)?;
        latest.create(&conn)?;
        conn
    };
    configure_connection(&conn)?;

    let db_version = conn
        .query_row("PRAGMA user_version;", [], |row| row.get::<usize, i64>(0))
        .context("Failed to read database version")?
        - BASE_DB_VERSION as i64;

    if db_version < 0 {
        bail!(
            "Database version {} is too old, does not contain base db version {}",
            db_version,
            BASE_DB_VERSION
        );
    }
    let version = db_version as usize;
    if version >= schemas.len() {
        bail!("Database version {} is too new", version);
    }

    schemas
        .get(version)
        .context("Failed to get schema")?
        .validate(&conn)?;
    migrate_if_needed(&conn, schemas, version)?;

    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite_column;
    use tempfile::TempDir;

    const PARENT_TABLE: Table = Table {
        name: "parent",
        columns: &[
            sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
            sqlite_column!("name", &SqlType::Text, non_null = true),
        ],
        indices: &[("idx_parent_name", "name")],
        unique_constraints: &[],
        partial_unique_indices: &[],
    };

    const CHILD_TABLE: Table = Table {
        name: "child",
        columns: &[
            sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
            sqlite_column!(
                "parent_id",
                &SqlType::Integer,
                non_null = true,
                foreign_key = Some(&ForeignKey {
                    foreign_table: "parent",
                    foreign_column: "id",
                    on_delete: ForeignKeyOnChange::Cascade,
                })
            ),
            sqlite_column!("tag", &SqlType::Text, non_null = true),
            sqlite_column!("is_main", &SqlType::Integer, non_null = true, default_value = Some("0")),
        ],
        indices: &[],
        unique_constraints: &[&["parent_id", "tag"]],
        partial_unique_indices: &[PartialUniqueIndex {
            name: "idx_child_single_main",
            columns: &["parent_id"],
            predicate: "is_main = 1",
        }],
    };

    const SCHEMAS: &[VersionedSchema] = &[
        VersionedSchema {
            version: 0,
            tables: &[PARENT_TABLE],
            migration: None,
        },
        VersionedSchema {
            version: 1,
            tables: &[PARENT_TABLE, CHILD_TABLE],
            migration: Some(|conn: &Connection| CHILD_TABLE.create(conn)),
        },
    ];

    fn user_version(conn: &Connection) -> i64 {
        conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn creates_latest_schema_on_new_file() {
        let temp_dir = TempDir::new().unwrap();
        let conn = open_versioned_db(temp_dir.path().join("new.db"), SCHEMAS).unwrap();

        assert_eq!(user_version(&conn), BASE_DB_VERSION as i64 + 1);
        SCHEMAS[1].validate(&conn).unwrap();
    }

    #[test]
    fn migrates_older_file_forward() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("old.db");
        {
            let conn = Connection::open(&path).unwrap();
            SCHEMAS[0].create(&conn).unwrap();
            conn.execute("INSERT INTO parent (name) VALUES ('kept')", [])
                .unwrap();
        }

        let conn = open_versioned_db(&path, SCHEMAS).unwrap();
        assert_eq!(user_version(&conn), BASE_DB_VERSION as i64 + 1);
        let name: String = conn
            .query_row("SELECT name FROM parent", [], |row| row.get(0))
            .unwrap();
        assert_eq!(name, "kept");
        SCHEMAS[1].validate(&conn).unwrap();
    }

    #[test]
    fn rejects_newer_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("future.db");
        {
            let conn = Connection::open(&path).unwrap();
            SCHEMAS[1].create(&conn).unwrap();
            conn.execute(
                &format!("PRAGMA user_version = {}", BASE_DB_VERSION + 5),
                [],
            )
            .unwrap();
        }

        let err = open_versioned_db(&path, SCHEMAS).unwrap_err();
        assert!(err.to_string().contains("too new"));
    }

    #[test]
    fn validate_detects_missing_partial_index() {
        let conn = Connection::open_in_memory().unwrap();
        PARENT_TABLE.create(&conn).unwrap();
        conn.execute(
            "CREATE TABLE child (id INTEGER PRIMARY KEY, parent_id INTEGER NOT NULL, tag TEXT NOT NULL, is_main INTEGER NOT NULL DEFAULT 0, UNIQUE (parent_id, tag))",
            [],
        )
        .unwrap();

        let err = SCHEMAS[1].validate(&conn).unwrap_err();
        assert!(err.to_string().contains("idx_child_single_main"));
    }

    #[test]
    fn validate_detects_missing_unique_constraint() {
        let conn = Connection::open_in_memory().unwrap();
        PARENT_TABLE.create(&conn).unwrap();
        conn.execute(
            "CREATE TABLE child (id INTEGER PRIMARY KEY, parent_id INTEGER NOT NULL, tag TEXT NOT NULL, is_main INTEGER NOT NULL DEFAULT 0)",
            [],
        )
        .unwrap();
        conn.execute(
            "CREATE UNIQUE INDEX idx_child_single_main ON child(parent_id) WHERE is_main = 1",
            [],
        )
        .unwrap();

        let err = SCHEMAS[1].validate(&conn).unwrap_err();
        assert!(err.to_string().contains("missing unique constraint"));
    }

    #[test]
    fn partial_unique_index_allows_one_main_row_per_parent() {
        let conn = Connection::open_in_memory().unwrap();
        configure_connection(&conn).unwrap();
        SCHEMAS[1].create(&conn).unwrap();
        conn.execute("INSERT INTO parent (name) VALUES ('p')", [])
            .unwrap();

        conn.execute(
            "INSERT INTO child (parent_id, tag, is_main) VALUES (1, 'a', 1)",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO child (parent_id, tag, is_main) VALUES (1, 'b', 0)",
            [],
        )
        .unwrap();
        let second_main = conn.execute(
            "INSERT INTO child (parent_id, tag, is_main) VALUES (1, 'c', 1)",
            [],
        );
        assert!(second_main.is_err());
    }
}
