//! Schema DDL for the three databases. Idempotent: every statement is
//! CREATE ... IF NOT EXISTS, so opening an existing database is a no-op.

/// assets.db - device inventory, captures, change history, named jobs.
pub const ASSETS_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS vendors (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT UNIQUE NOT NULL,
    short_name TEXT
);

CREATE TABLE IF NOT EXISTS sites (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT UNIQUE NOT NULL,
    description TEXT
);

CREATE TABLE IF NOT EXISTS device_roles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT UNIQUE NOT NULL,
    description TEXT
);

CREATE TABLE IF NOT EXISTS devices (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    normalized_name TEXT UNIQUE NOT NULL,
    management_ip TEXT,
    ipv4_address TEXT,
    vendor_id INTEGER,
    site_id INTEGER,
    role_id INTEGER,
    device_type TEXT,
    platform TEXT,
    model TEXT,
    software_version TEXT,
    serial TEXT,
    source_system TEXT,
    fingerprinted_at TEXT,
    timestamp TEXT,
    FOREIGN KEY (vendor_id) REFERENCES vendors(id),
    FOREIGN KEY (site_id) REFERENCES sites(id),
    FOREIGN KEY (role_id) REFERENCES device_roles(id)
);

CREATE INDEX IF NOT EXISTS idx_devices_vendor ON devices(vendor_id);
CREATE INDEX IF NOT EXISTS idx_devices_site ON devices(site_id);
CREATE INDEX IF NOT EXISTS idx_devices_mgmt_ip ON devices(management_ip);

CREATE TABLE IF NOT EXISTS components (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    device_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    description TEXT,
    serial TEXT,
    position TEXT,
    have_sn INTEGER NOT NULL DEFAULT 0,
    type TEXT,
    subtype TEXT,
    extraction_source TEXT,
    extraction_confidence REAL,
    FOREIGN KEY (device_id) REFERENCES devices(id),
    UNIQUE(device_id, name, position)
);

CREATE INDEX IF NOT EXISTS idx_components_device ON components(device_id);
CREATE INDEX IF NOT EXISTS idx_components_serial ON components(serial);

CREATE TABLE IF NOT EXISTS device_captures_current (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    device_id INTEGER NOT NULL,
    capture_type TEXT NOT NULL,
    file_path TEXT NOT NULL,
    file_size INTEGER,
    capture_timestamp TEXT NOT NULL,
    content_hash TEXT,
    extraction_success INTEGER NOT NULL DEFAULT 1,
    command_used TEXT,
    FOREIGN KEY (device_id) REFERENCES devices(id),
    UNIQUE(device_id, capture_type)
);

CREATE INDEX IF NOT EXISTS idx_current_timestamp
    ON device_captures_current(capture_timestamp);

CREATE TABLE IF NOT EXISTS capture_snapshots (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    device_id INTEGER NOT NULL,
    capture_type TEXT NOT NULL,
    captured_at TEXT NOT NULL,
    file_path TEXT NOT NULL,
    file_size INTEGER,
    content TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    FOREIGN KEY (device_id) REFERENCES devices(id),
    UNIQUE(device_id, capture_type, content_hash)
);

CREATE INDEX IF NOT EXISTS idx_snapshots_device_type_time
    ON capture_snapshots(device_id, capture_type, captured_at);
CREATE INDEX IF NOT EXISTS idx_snapshots_hash ON capture_snapshots(content_hash);

CREATE TABLE IF NOT EXISTS capture_changes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    device_id INTEGER NOT NULL,
    capture_type TEXT NOT NULL,
    detected_at TEXT NOT NULL,
    previous_snapshot_id INTEGER,
    current_snapshot_id INTEGER NOT NULL,
    lines_added INTEGER NOT NULL DEFAULT 0,
    lines_removed INTEGER NOT NULL DEFAULT 0,
    diff_path TEXT,
    severity TEXT NOT NULL CHECK(severity IN ('minor', 'moderate', 'critical')),
    FOREIGN KEY (device_id) REFERENCES devices(id),
    FOREIGN KEY (previous_snapshot_id) REFERENCES capture_snapshots(id),
    FOREIGN KEY (current_snapshot_id) REFERENCES capture_snapshots(id)
);

CREATE INDEX IF NOT EXISTS idx_changes_device_time
    ON capture_changes(device_id, detected_at);
CREATE INDEX IF NOT EXISTS idx_changes_severity ON capture_changes(severity);

CREATE VIRTUAL TABLE IF NOT EXISTS capture_fts USING fts5(
    content,
    content=capture_snapshots,
    content_rowid=id
);

CREATE TRIGGER IF NOT EXISTS capture_fts_insert
AFTER INSERT ON capture_snapshots BEGIN
    INSERT INTO capture_fts(rowid, content) VALUES (new.id, new.content);
END;

CREATE TABLE IF NOT EXISTS collection_jobs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT UNIQUE NOT NULL,
    capture_types TEXT NOT NULL,
    device_selection TEXT NOT NULL,
    schedule TEXT,
    enabled INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    last_run_at TEXT,
    last_run_status TEXT
);
"#;

/// arp_cat.db - ARP history with VRF/VDOM contexts.
pub const ARP_CAT_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS devices (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    hostname TEXT NOT NULL,
    normalized_hostname TEXT UNIQUE NOT NULL,
    vendor TEXT,
    device_type TEXT,
    first_seen TEXT NOT NULL,
    last_seen TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS contexts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    device_id INTEGER NOT NULL,
    context_name TEXT NOT NULL,
    context_type TEXT NOT NULL DEFAULT 'default',
    first_seen TEXT NOT NULL,
    last_seen TEXT NOT NULL,
    FOREIGN KEY (device_id) REFERENCES devices(id),
    UNIQUE(device_id, context_name)
);

CREATE INDEX IF NOT EXISTS idx_contexts_device ON contexts(device_id);

CREATE TABLE IF NOT EXISTS arp_entries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    device_id INTEGER NOT NULL,
    context_id INTEGER NOT NULL,
    ip_address TEXT NOT NULL,
    mac_address TEXT NOT NULL,
    mac_address_raw TEXT,
    interface TEXT,
    entry_type TEXT,
    captured_at TEXT NOT NULL,
    FOREIGN KEY (device_id) REFERENCES devices(id),
    FOREIGN KEY (context_id) REFERENCES contexts(id),
    UNIQUE(device_id, context_id, ip_address, mac_address, captured_at)
);

CREATE INDEX IF NOT EXISTS idx_arp_entries_mac ON arp_entries(mac_address);
CREATE INDEX IF NOT EXISTS idx_arp_entries_ip ON arp_entries(ip_address);
CREATE INDEX IF NOT EXISTS idx_arp_entries_device_context
    ON arp_entries(device_id, context_id);
CREATE INDEX IF NOT EXISTS idx_arp_entries_captured ON arp_entries(captured_at);
"#;

/// users.db - local users; auth backends are external collaborators.
pub const USERS_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT UNIQUE NOT NULL,
    password_hash TEXT NOT NULL,
    is_admin INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    last_login_at TEXT
);
"#;
