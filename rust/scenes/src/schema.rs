//! Diesel schema for the scenes table.

diesel::table! {
    use diesel::sql_types::*;

    scenes (id) {
        id -> Uuid,
        title -> Text,
        description -> Nullable<Text>,
        created -> Timestamptz,
    }
}

/// Idempotent DDL applied when the PostgreSQL store starts.
pub const CREATE_SCENES: &str = r#"
CREATE TABLE IF NOT EXISTS scenes (
    id UUID PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT,
    created TIMESTAMPTZ NOT NULL
);
CREATE INDEX IF NOT EXISTS scenes_created_id_idx ON scenes (created, id);
"#;
