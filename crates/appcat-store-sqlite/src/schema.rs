//! SQL schema for the catalog store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
///
/// The index names are the declared index names, quoted, so `INDEXED BY`
/// clauses read the same as the query layer.
pub const SCHEMA: &str = r#"
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS apps (
    app_id          INTEGER NOT NULL,
    country         TEXT    NOT NULL,
    -- price-index key attributes
    currency        TEXT,
    price           REAL,
    -- derived device attributes; NULL when the family is unsupported
    supports_phone  INTEGER,
    supports_pad    INTEGER,
    supports_pod    INTEGER,
    phone_devices   TEXT,            -- JSON array
    pad_devices     TEXT,            -- JSON array
    pod_devices     TEXT,            -- JSON array
    -- the full record image, authoritative on read
    record_json     TEXT    NOT NULL,
    PRIMARY KEY (app_id, country)
);

CREATE INDEX IF NOT EXISTS "price-index"  ON apps(currency, price);
CREATE INDEX IF NOT EXISTS "iphone-index" ON apps(supports_phone);
CREATE INDEX IF NOT EXISTS "ipad-index"   ON apps(supports_pad);
CREATE INDEX IF NOT EXISTS "ipod-index"   ON apps(supports_pod);

PRAGMA user_version = 1;
"#;
