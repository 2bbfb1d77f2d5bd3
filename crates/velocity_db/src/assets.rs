//! assets.db store: devices, components, captures, snapshots, changes,
//! full-text search, named collection jobs.

use chrono::{DateTime, Utc};
use sqlx::{Executor, Row, SqlitePool};
use std::path::Path;
use tracing::debug;

use velocity_protocol::{normalize_name, CaptureType, Severity};

use crate::error::DbError;
use crate::models::{
    CaptureChange, CaptureSnapshot, Component, CurrentCapture, Device, DeviceUpsert, SavedJob,
    SearchHit,
};
use crate::schema::ASSETS_SCHEMA;

#[derive(Clone)]
pub struct AssetsDb {
    pool: SqlitePool,
}

impl AssetsDb {
    pub async fn open(path: &Path) -> Result<Self, DbError> {
        let pool = crate::open_pool(path).await?;
        let db = Self { pool };
        db.init_schema().await?;
        Ok(db)
    }

    pub async fn open_in_memory() -> Result<Self, DbError> {
        let pool = crate::open_memory_pool().await?;
        let db = Self { pool };
        db.init_schema().await?;
        Ok(db)
    }

    async fn init_schema(&self) -> Result<(), DbError> {
        self.pool.execute(ASSETS_SCHEMA).await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // ========================================================================
    // Reference tables
    // ========================================================================

    async fn get_or_create_ref(&self, table: &str, name: &str) -> Result<i64, DbError> {
        // Table names come from this crate only, never user input.
        let select = format!("SELECT id FROM {} WHERE name = ?1", table);
        if let Some(row) = sqlx::query(&select)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?
        {
            return Ok(row.get::<i64, _>("id"));
        }
        let insert = format!("INSERT INTO {} (name) VALUES (?1)", table);
        let result = sqlx::query(&insert).bind(name).execute(&self.pool).await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn get_or_create_vendor(&self, name: &str) -> Result<i64, DbError> {
        self.get_or_create_ref("vendors", name).await
    }

    pub async fn get_or_create_site(&self, name: &str) -> Result<i64, DbError> {
        self.get_or_create_ref("sites", name).await
    }

    // ========================================================================
    // Devices
    // ========================================================================

    /// Insert or merge a device keyed by normalized name. Only non-empty
    /// incoming fields overwrite stored values.
    pub async fn upsert_device(&self, record: &DeviceUpsert) -> Result<i64, DbError> {
        let normalized = normalize_name(&record.name);
        let vendor_id = match &record.vendor {
            Some(v) if !v.is_empty() => Some(self.get_or_create_vendor(v).await?),
            _ => None,
        };
        let site_id = match &record.site {
            Some(s) if !s.is_empty() => Some(self.get_or_create_site(s).await?),
            _ => None,
        };
        let now = Utc::now();

        let existing = sqlx::query("SELECT id FROM devices WHERE normalized_name = ?1")
            .bind(&normalized)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(row) = existing {
            let id = row.get::<i64, _>("id");
            sqlx::query(
                r#"
                UPDATE devices SET
                    name = ?1,
                    management_ip = COALESCE(?2, management_ip),
                    ipv4_address = COALESCE(?3, ipv4_address),
                    vendor_id = COALESCE(?4, vendor_id),
                    site_id = COALESCE(?5, site_id),
                    device_type = COALESCE(?6, device_type),
                    platform = COALESCE(?7, platform),
                    model = COALESCE(?8, model),
                    software_version = COALESCE(?9, software_version),
                    serial = COALESCE(?10, serial),
                    source_system = COALESCE(?11, source_system),
                    fingerprinted_at = COALESCE(?12, fingerprinted_at),
                    timestamp = ?13
                WHERE id = ?14
                "#,
            )
            .bind(&record.name)
            .bind(&record.management_ip)
            .bind(&record.ipv4_address)
            .bind(vendor_id)
            .bind(site_id)
            .bind(&record.device_type)
            .bind(&record.platform)
            .bind(&record.model)
            .bind(&record.software_version)
            .bind(&record.serial)
            .bind(&record.source_system)
            .bind(record.fingerprinted_at)
            .bind(now)
            .bind(id)
            .execute(&self.pool)
            .await?;
            debug!(device = %normalized, id, "updated device");
            return Ok(id);
        }

        let result = sqlx::query(
            r#"
            INSERT INTO devices (
                name, normalized_name, management_ip, ipv4_address, vendor_id,
                site_id, device_type, platform, model, software_version,
                serial, source_system, fingerprinted_at, timestamp
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
        )
        .bind(&record.name)
        .bind(&normalized)
        .bind(&record.management_ip)
        .bind(&record.ipv4_address)
        .bind(vendor_id)
        .bind(site_id)
        .bind(&record.device_type)
        .bind(&record.platform)
        .bind(&record.model)
        .bind(&record.software_version)
        .bind(&record.serial)
        .bind(&record.source_system)
        .bind(record.fingerprinted_at)
        .bind(now)
        .execute(&self.pool)
        .await?;
        let id = result.last_insert_rowid();
        debug!(device = %normalized, id, "created device");
        Ok(id)
    }

    fn device_from_row(row: &sqlx::sqlite::SqliteRow) -> Device {
        Device {
            id: row.get("id"),
            name: row.get("name"),
            normalized_name: row.get("normalized_name"),
            management_ip: row.get("management_ip"),
            ipv4_address: row.get("ipv4_address"),
            vendor: row.get("vendor"),
            site: row.get("site"),
            device_type: row.get("device_type"),
            platform: row.get("platform"),
            model: row.get("model"),
            software_version: row.get("software_version"),
            serial: row.get("serial"),
            source_system: row.get("source_system"),
            fingerprinted_at: row.get("fingerprinted_at"),
        }
    }

    const DEVICE_SELECT: &'static str = r#"
        SELECT d.id, d.name, d.normalized_name, d.management_ip, d.ipv4_address,
               v.name AS vendor, s.name AS site, d.device_type, d.platform,
               d.model, d.software_version, d.serial, d.source_system,
               d.fingerprinted_at
        FROM devices d
        LEFT JOIN vendors v ON d.vendor_id = v.id
        LEFT JOIN sites s ON d.site_id = s.id
    "#;

    /// Resolve a device by normalized hostname, falling back to management
    /// then ipv4 address.
    pub async fn find_device(&self, key: &str) -> Result<Option<Device>, DbError> {
        let normalized = normalize_name(key);
        let sql = format!(
            "{} WHERE d.normalized_name = ?1 OR d.management_ip = ?2 OR d.ipv4_address = ?2 \
             ORDER BY CASE WHEN d.normalized_name = ?1 THEN 0 \
                           WHEN d.management_ip = ?2 THEN 1 ELSE 2 END LIMIT 1",
            Self::DEVICE_SELECT
        );
        let row = sqlx::query(&sql)
            .bind(&normalized)
            .bind(key.trim())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(Self::device_from_row))
    }

    pub async fn device_by_id(&self, id: i64) -> Result<Option<Device>, DbError> {
        let sql = format!("{} WHERE d.id = ?1", Self::DEVICE_SELECT);
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        Ok(row.as_ref().map(Self::device_from_row))
    }

    pub async fn all_devices(&self) -> Result<Vec<Device>, DbError> {
        let sql = format!("{} ORDER BY d.normalized_name", Self::DEVICE_SELECT);
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(Self::device_from_row).collect())
    }

    /// Devices matched by a selection string: `all`, `vendor=cisco_ios`,
    /// `site=iad2`, or a comma-separated hostname list.
    pub async fn select_devices(&self, selection: &str) -> Result<Vec<Device>, DbError> {
        let selection = selection.trim();
        if selection.is_empty() || selection.eq_ignore_ascii_case("all") {
            return self.all_devices().await;
        }
        if let Some(vendor) = selection.strip_prefix("vendor=") {
            let all = self.all_devices().await?;
            let vendor = vendor.to_lowercase();
            return Ok(all
                .into_iter()
                .filter(|d| {
                    d.platform
                        .as_deref()
                        .map(|p| p.to_lowercase().contains(&vendor))
                        .unwrap_or(false)
                        || d.vendor
                            .as_deref()
                            .map(|v| v.to_lowercase().contains(&vendor))
                            .unwrap_or(false)
                })
                .collect());
        }
        if let Some(site) = selection.strip_prefix("site=") {
            let all = self.all_devices().await?;
            let site = site.to_lowercase();
            return Ok(all
                .into_iter()
                .filter(|d| {
                    d.site
                        .as_deref()
                        .map(|s| s.to_lowercase() == site)
                        .unwrap_or(false)
                })
                .collect());
        }

        let mut out = Vec::new();
        for name in selection.split(',') {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            if let Some(device) = self.find_device(name).await? {
                out.push(device);
            }
        }
        Ok(out)
    }

    // ========================================================================
    // Components
    // ========================================================================

    /// Replace all components for a device in one transaction.
    pub async fn replace_components(
        &self,
        device_id: i64,
        components: &[Component],
    ) -> Result<usize, DbError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM components WHERE device_id = ?1")
            .bind(device_id)
            .execute(&mut *tx)
            .await?;

        let mut inserted = 0;
        for c in components {
            let result = sqlx::query(
                r#"
                INSERT OR IGNORE INTO components (
                    device_id, name, description, serial, position, have_sn,
                    type, subtype, extraction_source, extraction_confidence
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
            )
            .bind(device_id)
            .bind(&c.name)
            .bind(&c.description)
            .bind(&c.serial)
            .bind(&c.position)
            .bind(c.have_sn)
            .bind(&c.component_type)
            .bind(&c.subtype)
            .bind(&c.extraction_source)
            .bind(c.extraction_confidence)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected() as usize;
        }
        tx.commit().await?;
        Ok(inserted)
    }

    pub async fn components_for(&self, device_id: i64) -> Result<Vec<Component>, DbError> {
        let rows = sqlx::query(
            r#"
            SELECT device_id, name, description, serial, position, have_sn,
                   type, subtype, extraction_source, extraction_confidence
            FROM components WHERE device_id = ?1 ORDER BY name, position
            "#,
        )
        .bind(device_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .iter()
            .map(|row| Component {
                device_id: row.get("device_id"),
                name: row.get("name"),
                description: row.get("description"),
                serial: row.get("serial"),
                position: row.get("position"),
                have_sn: row.get("have_sn"),
                component_type: row.get("type"),
                subtype: row.get("subtype"),
                extraction_source: row.get("extraction_source"),
                extraction_confidence: row.get("extraction_confidence"),
            })
            .collect())
    }

    // ========================================================================
    // Current captures
    // ========================================================================

    pub async fn upsert_current_capture(&self, capture: &CurrentCapture) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO device_captures_current (
                device_id, capture_type, file_path, file_size,
                capture_timestamp, content_hash, extraction_success, command_used
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(device_id, capture_type) DO UPDATE SET
                file_path = excluded.file_path,
                file_size = excluded.file_size,
                capture_timestamp = excluded.capture_timestamp,
                content_hash = excluded.content_hash,
                extraction_success = excluded.extraction_success,
                command_used = excluded.command_used
            "#,
        )
        .bind(capture.device_id)
        .bind(capture.capture_type.as_str())
        .bind(&capture.file_path)
        .bind(capture.file_size)
        .bind(capture.capture_timestamp)
        .bind(&capture.content_hash)
        .bind(capture.extraction_success)
        .bind(&capture.command_used)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn current_capture(
        &self,
        device_id: i64,
        capture_type: CaptureType,
    ) -> Result<Option<CurrentCapture>, DbError> {
        let row = sqlx::query(
            r#"
            SELECT device_id, capture_type, file_path, file_size,
                   capture_timestamp, content_hash, extraction_success, command_used
            FROM device_captures_current
            WHERE device_id = ?1 AND capture_type = ?2
            "#,
        )
        .bind(device_id)
        .bind(capture_type.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|row| CurrentCapture {
            device_id: row.get("device_id"),
            capture_type,
            file_path: row.get("file_path"),
            file_size: row.get::<Option<i64>, _>("file_size").unwrap_or(0),
            capture_timestamp: row.get("capture_timestamp"),
            content_hash: row.get("content_hash"),
            extraction_success: row.get("extraction_success"),
            command_used: row.get("command_used"),
        }))
    }

    // ========================================================================
    // Snapshots and changes
    // ========================================================================

    pub async fn latest_snapshot(
        &self,
        device_id: i64,
        capture_type: CaptureType,
    ) -> Result<Option<CaptureSnapshot>, DbError> {
        let row = sqlx::query(
            r#"
            SELECT id, device_id, capture_type, captured_at, file_path, content, content_hash
            FROM capture_snapshots
            WHERE device_id = ?1 AND capture_type = ?2
            ORDER BY captured_at DESC, id DESC LIMIT 1
            "#,
        )
        .bind(device_id)
        .bind(capture_type.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|row| CaptureSnapshot {
            id: row.get("id"),
            device_id: row.get("device_id"),
            capture_type,
            captured_at: row.get("captured_at"),
            file_path: row.get("file_path"),
            content: row.get("content"),
            content_hash: row.get("content_hash"),
        }))
    }

    /// Insert a snapshot row. The (device, type, hash) unique constraint is
    /// the final dedup guard under concurrent loaders; a duplicate returns
    /// the existing row's id with `inserted = false`.
    pub async fn insert_snapshot(
        &self,
        device_id: i64,
        capture_type: CaptureType,
        captured_at: DateTime<Utc>,
        file_path: &str,
        content: &str,
        content_hash: &str,
    ) -> Result<(i64, bool), DbError> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO capture_snapshots (
                device_id, capture_type, captured_at, file_path, file_size,
                content, content_hash
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(device_id)
        .bind(capture_type.as_str())
        .bind(captured_at)
        .bind(file_path)
        .bind(content.len() as i64)
        .bind(content)
        .bind(content_hash)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok((result.last_insert_rowid(), true));
        }
        let row = sqlx::query(
            "SELECT id FROM capture_snapshots \
             WHERE device_id = ?1 AND capture_type = ?2 AND content_hash = ?3",
        )
        .bind(device_id)
        .bind(capture_type.as_str())
        .bind(content_hash)
        .fetch_one(&self.pool)
        .await?;
        Ok((row.get::<i64, _>("id"), false))
    }

    pub async fn insert_change(
        &self,
        device_id: i64,
        capture_type: CaptureType,
        previous_snapshot_id: Option<i64>,
        current_snapshot_id: i64,
        lines_added: i64,
        lines_removed: i64,
        diff_path: Option<&str>,
        severity: Severity,
    ) -> Result<i64, DbError> {
        let result = sqlx::query(
            r#"
            INSERT INTO capture_changes (
                device_id, capture_type, detected_at, previous_snapshot_id,
                current_snapshot_id, lines_added, lines_removed, diff_path, severity
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(device_id)
        .bind(capture_type.as_str())
        .bind(Utc::now())
        .bind(previous_snapshot_id)
        .bind(current_snapshot_id)
        .bind(lines_added)
        .bind(lines_removed)
        .bind(diff_path)
        .bind(severity.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn recent_changes(&self, hours: i64) -> Result<Vec<CaptureChange>, DbError> {
        let cutoff = Utc::now() - chrono::Duration::hours(hours);
        let rows = sqlx::query(
            r#"
            SELECT id, device_id, capture_type, detected_at, previous_snapshot_id,
                   current_snapshot_id, lines_added, lines_removed, diff_path, severity
            FROM capture_changes
            WHERE detected_at > ?1
            ORDER BY detected_at DESC
            "#,
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|row| {
                let ct: String = row.get("capture_type");
                let sev: String = row.get("severity");
                Ok(CaptureChange {
                    id: row.get("id"),
                    device_id: row.get("device_id"),
                    capture_type: ct
                        .parse()
                        .map_err(|e: String| DbError::Integrity(e))?,
                    detected_at: row.get("detected_at"),
                    previous_snapshot_id: row.get("previous_snapshot_id"),
                    current_snapshot_id: row.get("current_snapshot_id"),
                    lines_added: row.get("lines_added"),
                    lines_removed: row.get("lines_removed"),
                    diff_path: row.get("diff_path"),
                    severity: sev.parse().map_err(|e: String| DbError::Integrity(e))?,
                })
            })
            .collect()
    }

    pub async fn snapshot_count(&self) -> Result<i64, DbError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM capture_snapshots")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    pub async fn change_count(&self) -> Result<i64, DbError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM capture_changes")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    /// Full-text search over snapshot history.
    pub async fn search_snapshots(
        &self,
        query: &str,
        limit: i64,
    ) -> Result<Vec<SearchHit>, DbError> {
        let rows = sqlx::query(
            r#"
            SELECT d.name AS device_name, s.capture_type, s.captured_at,
                   snippet(capture_fts, 0, '[', ']', ' … ', 10) AS snippet
            FROM capture_fts
            JOIN capture_snapshots s ON s.id = capture_fts.rowid
            JOIN devices d ON d.id = s.device_id
            WHERE capture_fts MATCH ?1
            ORDER BY s.captured_at DESC
            LIMIT ?2
            "#,
        )
        .bind(query)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .iter()
            .map(|row| SearchHit {
                device_name: row.get("device_name"),
                capture_type: row.get("capture_type"),
                captured_at: row.get("captured_at"),
                snippet: row.get("snippet"),
            })
            .collect())
    }

    // ========================================================================
    // Named collection jobs
    // ========================================================================

    pub async fn create_job(
        &self,
        name: &str,
        capture_types: &[CaptureType],
        device_selection: &str,
        schedule: Option<&str>,
    ) -> Result<i64, DbError> {
        let types: Vec<&str> = capture_types.iter().map(|ct| ct.as_str()).collect();
        let result = sqlx::query(
            r#"
            INSERT INTO collection_jobs (name, capture_types, device_selection, schedule, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(name)
        .bind(types.join(","))
        .bind(device_selection)
        .bind(schedule)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    fn job_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<SavedJob, DbError> {
        let types: String = row.get("capture_types");
        let capture_types =
            CaptureType::parse_list(&types).map_err(DbError::Integrity)?;
        Ok(SavedJob {
            id: row.get("id"),
            name: row.get("name"),
            capture_types,
            device_selection: row.get("device_selection"),
            schedule: row.get("schedule"),
            enabled: row.get("enabled"),
            created_at: row.get("created_at"),
            last_run_at: row.get("last_run_at"),
            last_run_status: row.get("last_run_status"),
        })
    }

    pub async fn job_by_name(&self, name: &str) -> Result<SavedJob, DbError> {
        let row = sqlx::query("SELECT * FROM collection_jobs WHERE name = ?1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::JobNotFound(name.to_string()))?;
        Self::job_from_row(&row)
    }

    pub async fn list_jobs(&self) -> Result<Vec<SavedJob>, DbError> {
        let rows = sqlx::query("SELECT * FROM collection_jobs ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::job_from_row).collect()
    }

    pub async fn set_job_enabled(&self, name: &str, enabled: bool) -> Result<(), DbError> {
        let result = sqlx::query("UPDATE collection_jobs SET enabled = ?1 WHERE name = ?2")
            .bind(enabled)
            .bind(name)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::JobNotFound(name.to_string()));
        }
        Ok(())
    }

    pub async fn record_job_run(&self, name: &str, status: &str) -> Result<(), DbError> {
        sqlx::query(
            "UPDATE collection_jobs SET last_run_at = ?1, last_run_status = ?2 WHERE name = ?3",
        )
        .bind(Utc::now())
        .bind(status)
        .bind(name)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn delete_job(&self, name: &str) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM collection_jobs WHERE name = ?1")
            .bind(name)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::JobNotFound(name.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DeviceUpsert;

    fn upsert(name: &str) -> DeviceUpsert {
        DeviceUpsert {
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn device_upsert_merges_fields() {
        let db = AssetsDb::open_in_memory().await.unwrap();
        let id = db
            .upsert_device(&DeviceUpsert {
                name: "Core1.IAD2".into(),
                management_ip: Some("10.0.0.1".into()),
                vendor: Some("Cisco".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        // Second source knows the model but not the IP.
        let id2 = db
            .upsert_device(&DeviceUpsert {
                name: "core1.iad2".into(),
                model: Some("WS-C3850-48T".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(id, id2);

        let device = db.find_device("core1.iad2").await.unwrap().unwrap();
        assert_eq!(device.management_ip.as_deref(), Some("10.0.0.1"));
        assert_eq!(device.model.as_deref(), Some("WS-C3850-48T"));
        assert_eq!(device.vendor.as_deref(), Some("Cisco"));
    }

    #[tokio::test]
    async fn device_resolution_falls_back_to_ip() {
        let db = AssetsDb::open_in_memory().await.unwrap();
        db.upsert_device(&DeviceUpsert {
            name: "edge7".into(),
            management_ip: Some("192.0.2.7".into()),
            ..Default::default()
        })
        .await
        .unwrap();

        assert!(db.find_device("edge7").await.unwrap().is_some());
        assert!(db.find_device("192.0.2.7").await.unwrap().is_some());
        assert!(db.find_device("192.0.2.99").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn components_replace_by_device() {
        let db = AssetsDb::open_in_memory().await.unwrap();
        let id = db.upsert_device(&upsert("sw1")).await.unwrap();

        let comp = |name: &str, pos: &str| Component {
            device_id: id,
            name: name.into(),
            description: None,
            serial: Some("X".into()),
            position: Some(pos.into()),
            have_sn: true,
            component_type: "module".into(),
            subtype: None,
            extraction_source: None,
            extraction_confidence: Some(0.9),
        };

        db.replace_components(id, &[comp("PSU A", "1"), comp("PSU B", "2")])
            .await
            .unwrap();
        assert_eq!(db.components_for(id).await.unwrap().len(), 2);

        db.replace_components(id, &[comp("PSU A", "1")]).await.unwrap();
        assert_eq!(db.components_for(id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn snapshot_hash_dedup() {
        let db = AssetsDb::open_in_memory().await.unwrap();
        let id = db.upsert_device(&upsert("sw1")).await.unwrap();
        let now = Utc::now();

        let (snap1, inserted1) = db
            .insert_snapshot(id, CaptureType::Configs, now, "a.txt", "hostname sw1", "hash1")
            .await
            .unwrap();
        assert!(inserted1);
        let (snap2, inserted2) = db
            .insert_snapshot(id, CaptureType::Configs, now, "b.txt", "hostname sw1", "hash1")
            .await
            .unwrap();
        assert!(!inserted2);
        assert_eq!(snap1, snap2);
        assert_eq!(db.snapshot_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn fts_search_finds_snapshot_content() {
        let db = AssetsDb::open_in_memory().await.unwrap();
        let id = db.upsert_device(&upsert("sw1")).await.unwrap();
        db.insert_snapshot(
            id,
            CaptureType::Configs,
            Utc::now(),
            "a.txt",
            "interface Vlan20\n ip address 10.10.20.1 255.255.255.0\n",
            "h1",
        )
        .await
        .unwrap();

        let hits = db.search_snapshots("Vlan20", 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].device_name, "sw1");
        assert!(hits[0].snippet.contains("Vlan20"));
    }

    #[tokio::test]
    async fn saved_job_lifecycle() {
        let db = AssetsDb::open_in_memory().await.unwrap();
        db.create_job(
            "nightly-configs",
            &[CaptureType::Configs, CaptureType::Version],
            "all",
            Some("0 2 * * *"),
        )
        .await
        .unwrap();

        let job = db.job_by_name("nightly-configs").await.unwrap();
        assert!(job.enabled);
        assert_eq!(job.capture_types.len(), 2);

        db.set_job_enabled("nightly-configs", false).await.unwrap();
        assert!(!db.job_by_name("nightly-configs").await.unwrap().enabled);

        db.record_job_run("nightly-configs", "ok").await.unwrap();
        assert!(db.job_by_name("nightly-configs").await.unwrap().last_run_at.is_some());

        db.delete_job("nightly-configs").await.unwrap();
        assert!(matches!(
            db.job_by_name("nightly-configs").await,
            Err(DbError::JobNotFound(_))
        ));
    }
}
