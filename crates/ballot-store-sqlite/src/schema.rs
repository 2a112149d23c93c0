//! SQL schema for the Ballot SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id       INTEGER PRIMARY KEY AUTOINCREMENT,
    name          TEXT NOT NULL,
    email         TEXT NOT NULL UNIQUE,
    role          TEXT NOT NULL DEFAULT 'voter'
                  CHECK (role IN ('voter', 'admin')),
    password_hash TEXT,               -- argon2 PHC string; NULL for bulk uploads
    created_at    TEXT NOT NULL
);

-- One voter per user. has_voted only ever goes 0 -> 1.
CREATE TABLE IF NOT EXISTS voters (
    voter_id  INTEGER PRIMARY KEY,
    user_id   INTEGER NOT NULL UNIQUE REFERENCES users(user_id),
    has_voted INTEGER NOT NULL DEFAULT 0 CHECK (has_voted IN (0, 1))
);

CREATE TABLE IF NOT EXISTS elections (
    election_id INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL UNIQUE,
    status      TEXT NOT NULL DEFAULT 'active'
                CHECK (status IN ('active', 'completed')),
    created_at  TEXT NOT NULL
);

-- Candidate name and running count share a row, so they cannot drift apart.
CREATE TABLE IF NOT EXISTS tallies (
    election_id INTEGER NOT NULL REFERENCES elections(election_id),
    position    INTEGER NOT NULL,
    candidate   TEXT NOT NULL,
    votes       INTEGER NOT NULL DEFAULT 0 CHECK (votes >= 0),
    PRIMARY KEY (election_id, position),
    UNIQUE (election_id, candidate)
);

CREATE TABLE IF NOT EXISTS candidates (
    candidate_id INTEGER PRIMARY KEY AUTOINCREMENT,
    name         TEXT NOT NULL,
    party        TEXT,
    bio          TEXT,
    election_id  INTEGER NOT NULL REFERENCES elections(election_id)
);

CREATE TABLE IF NOT EXISTS votes (
    vote_id      INTEGER PRIMARY KEY AUTOINCREMENT,
    voter_id     INTEGER NOT NULL REFERENCES voters(voter_id),
    election_id  INTEGER NOT NULL REFERENCES elections(election_id),
    candidate    TEXT NOT NULL,
    candidate_id INTEGER REFERENCES candidates(candidate_id) ON DELETE SET NULL,
    cast_at      TEXT NOT NULL,
    UNIQUE (voter_id, election_id)
);

CREATE TABLE IF NOT EXISTS polling_stations (
    station_id  INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,
    location    TEXT NOT NULL,
    election_id INTEGER NOT NULL REFERENCES elections(election_id),
    capacity    INTEGER NOT NULL CHECK (capacity >= 0)
);

CREATE TABLE IF NOT EXISTS observers (
    observer_id  INTEGER PRIMARY KEY AUTOINCREMENT,
    name         TEXT NOT NULL,
    email        TEXT NOT NULL UNIQUE,
    election_id  INTEGER NOT NULL REFERENCES elections(election_id),
    organization TEXT
);

-- Feedback is never updated once filed.
CREATE TABLE IF NOT EXISTS observer_feedback (
    feedback_id  INTEGER PRIMARY KEY AUTOINCREMENT,
    observer_id  INTEGER NOT NULL REFERENCES observers(observer_id),
    election_id  INTEGER NOT NULL REFERENCES elections(election_id),
    description  TEXT NOT NULL,
    severity     TEXT NOT NULL CHECK (severity IN ('LOW', 'MEDIUM', 'HIGH')),
    submitted_at TEXT NOT NULL
);

-- Strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS audit_logs (
    log_id       INTEGER PRIMARY KEY AUTOINCREMENT,
    election_id  INTEGER NOT NULL REFERENCES elections(election_id),
    performed_by INTEGER NOT NULL REFERENCES users(user_id),
    action       TEXT NOT NULL,
    details      TEXT,
    timestamp    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS alerts (
    alert_id    INTEGER PRIMARY KEY AUTOINCREMENT,
    election_id INTEGER NOT NULL REFERENCES elections(election_id),
    alert_type  TEXT NOT NULL,
    message     TEXT NOT NULL,
    status      TEXT NOT NULL DEFAULT 'new'
                CHECK (status IN ('new', 'acknowledged', 'resolved')),
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS notifications (
    notification_id INTEGER PRIMARY KEY AUTOINCREMENT,
    alert_id        INTEGER NOT NULL REFERENCES alerts(alert_id),
    user_id         INTEGER NOT NULL REFERENCES users(user_id),
    message         TEXT NOT NULL,
    is_read         INTEGER NOT NULL DEFAULT 0 CHECK (is_read IN (0, 1)),
    created_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS subscriptions (
    subscription_id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id         INTEGER NOT NULL REFERENCES users(user_id),
    alert_type      TEXT NOT NULL,
    is_subscribed   INTEGER NOT NULL CHECK (is_subscribed IN (0, 1)),
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL,
    UNIQUE (user_id, alert_type)
);

-- History of subscription changes; append-only like audit_logs.
CREATE TABLE IF NOT EXISTS subscription_events (
    event_id   INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id    INTEGER NOT NULL REFERENCES users(user_id),
    alert_type TEXT NOT NULL,
    old_value  INTEGER,              -- NULL when the subscription was created
    new_value  INTEGER NOT NULL,
    changed_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS users_role_idx           ON users(role);
CREATE INDEX IF NOT EXISTS candidates_election_idx  ON candidates(election_id);
CREATE INDEX IF NOT EXISTS votes_election_idx       ON votes(election_id);
CREATE INDEX IF NOT EXISTS stations_election_idx    ON polling_stations(election_id);
CREATE INDEX IF NOT EXISTS observers_election_idx   ON observers(election_id);
CREATE INDEX IF NOT EXISTS feedback_election_idx    ON observer_feedback(election_id);
CREATE INDEX IF NOT EXISTS audit_election_idx       ON audit_logs(election_id);
CREATE INDEX IF NOT EXISTS alerts_election_idx      ON alerts(election_id);
CREATE INDEX IF NOT EXISTS notifications_user_idx   ON notifications(user_id);
CREATE INDEX IF NOT EXISTS subscription_events_idx  ON subscription_events(user_id);

PRAGMA user_version = 1;
";
