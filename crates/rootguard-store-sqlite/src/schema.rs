//! SQL schema for the RootGuard SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
///
/// Timestamps are fixed-width RFC 3339 UTC strings, so text comparison in
/// `WHERE` and `ORDER BY` follows time order.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS sensor_readings (
    reading_id       TEXT PRIMARY KEY,
    water_level      REAL NOT NULL,
    flow_rate        REAL NOT NULL,
    turbidity        REAL NOT NULL,
    soil_moisture    REAL NOT NULL,
    vibration_status TEXT NOT NULL,   -- 'low' | 'high'
    timestamp        TEXT NOT NULL
);

-- Single slot: only id = 1 is ever written.
CREATE TABLE IF NOT EXISTS health (
    id         INTEGER PRIMARY KEY CHECK (id = 1),
    score      INTEGER NOT NULL,
    status     TEXT NOT NULL,         -- 'normal' | 'warning' | 'critical'
    message    TEXT NOT NULL,
    reading_id TEXT REFERENCES sensor_readings(reading_id),
    updated_at TEXT NOT NULL
);

-- Single slot: only id = 1 is ever written.
CREATE TABLE IF NOT EXISTS control_state (
    id            INTEGER PRIMARY KEY CHECK (id = 1),
    mode          TEXT NOT NULL,
    is_irrigating INTEGER NOT NULL,
    auto_mode     INTEGER NOT NULL,
    last_updated  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS irrigation_sessions (
    session_id              TEXT PRIMARY KEY,
    mode                    TEXT NOT NULL,
    started_at              TEXT NOT NULL,
    ended_at                TEXT,
    duration_minutes        INTEGER,
    estimated_volume_liters REAL,
    trigger_reason          TEXT NOT NULL,
    sensor_reading_id       TEXT REFERENCES sensor_readings(reading_id)
);

-- At most one session may be open at a time.
CREATE UNIQUE INDEX IF NOT EXISTS sessions_single_open_idx
    ON irrigation_sessions(IFNULL(ended_at, '')) WHERE ended_at IS NULL;

CREATE TABLE IF NOT EXISTS alerts (
    alert_id              TEXT PRIMARY KEY,
    alert_type            TEXT NOT NULL,   -- 'critical' | 'warning' | 'info'
    message               TEXT NOT NULL,   -- canonical JSON of AlertMessage
    created_at            TEXT NOT NULL,
    is_dismissed          INTEGER NOT NULL DEFAULT 0,
    dismissed_at          TEXT,
    sensor_reading_id     TEXT REFERENCES sensor_readings(reading_id),
    irrigation_session_id TEXT REFERENCES irrigation_sessions(session_id)
);

CREATE INDEX IF NOT EXISTS readings_timestamp_idx ON sensor_readings(timestamp);
CREATE INDEX IF NOT EXISTS sessions_started_idx   ON irrigation_sessions(started_at);
CREATE INDEX IF NOT EXISTS alerts_created_idx     ON alerts(created_at);

PRAGMA user_version = 1;
";
