mod versioned_schema;

pub use versioned_schema::{
    open_versioned_db, Column, ForeignKey, ForeignKeyOnChange, PartialUniqueIndex, SqlType,
    Table, VersionedSchema, BASE_DB_VERSION, BUSY_TIMEOUT, DEFAULT_TIMESTAMP,
};
