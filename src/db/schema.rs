pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS locked_apps (
    id INTEGER PRIMARY KEY,
    package TEXT NOT NULL UNIQUE,
    locked_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS trigger_exclusions (
    id INTEGER PRIMARY KEY,
    package TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_locked_apps_package ON locked_apps(package);
"#;

pub const DEFAULT_TRIGGER_EXCLUSIONS: &[&str] = &[
    "com.android.phone",
    "com.android.server.telecom",
];
