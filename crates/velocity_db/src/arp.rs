//! arp_cat.db store: ARP sightings over time, keyed by device and context
//! (VRF/VDOM). Append-only history; duplicate MACs across devices are all
//! kept so the query layer can detect mobility.

use chrono::{DateTime, Utc};
use sqlx::{Executor, Row, SqlitePool};
use std::path::Path;

use velocity_protocol::normalize_name;

use crate::error::DbError;
use crate::models::ArpEntryRecord;
use crate::schema::ARP_CAT_SCHEMA;

/// One historical sighting returned by the search APIs.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ArpSighting {
    pub hostname: String,
    pub context: String,
    pub ip_address: String,
    pub mac_address: String,
    pub interface: Option<String>,
    pub captured_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct ArpCatDb {
    pool: SqlitePool,
}

impl ArpCatDb {
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
        self.pool.execute(ARP_CAT_SCHEMA).await?;
        Ok(())
    }

    pub async fn get_or_create_device(
        &self,
        hostname: &str,
        vendor: Option<&str>,
        device_type: Option<&str>,
    ) -> Result<i64, DbError> {
        let normalized = normalize_name(hostname);
        let now = Utc::now();

        if let Some(row) = sqlx::query("SELECT id FROM devices WHERE normalized_hostname = ?1")
            .bind(&normalized)
            .fetch_optional(&self.pool)
            .await?
        {
            let id = row.get::<i64, _>("id");
            sqlx::query("UPDATE devices SET last_seen = ?1 WHERE id = ?2")
                .bind(now)
                .bind(id)
                .execute(&self.pool)
                .await?;
            return Ok(id);
        }

        let result = sqlx::query(
            r#"
            INSERT INTO devices (hostname, normalized_hostname, vendor, device_type, first_seen, last_seen)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            "#,
        )
        .bind(hostname)
        .bind(&normalized)
        .bind(vendor)
        .bind(device_type)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn get_or_create_context(
        &self,
        device_id: i64,
        context_name: &str,
        context_type: &str,
    ) -> Result<i64, DbError> {
        let now = Utc::now();
        if let Some(row) =
            sqlx::query("SELECT id FROM contexts WHERE device_id = ?1 AND context_name = ?2")
                .bind(device_id)
                .bind(context_name)
                .fetch_optional(&self.pool)
                .await?
        {
            let id = row.get::<i64, _>("id");
            sqlx::query("UPDATE contexts SET last_seen = ?1 WHERE id = ?2")
                .bind(now)
                .bind(id)
                .execute(&self.pool)
                .await?;
            return Ok(id);
        }

        let result = sqlx::query(
            r#"
            INSERT INTO contexts (device_id, context_name, context_type, first_seen, last_seen)
            VALUES (?1, ?2, ?3, ?4, ?4)
            "#,
        )
        .bind(device_id)
        .bind(context_name)
        .bind(context_type)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Append a batch of sightings for one device capture in a single
    /// transaction. The (device, context, ip, mac, captured_at) key makes
    /// re-loading the same capture file a no-op while preserving history
    /// across captures.
    pub async fn add_entries(
        &self,
        device_id: i64,
        captured_at: DateTime<Utc>,
        entries: &[(i64, ArpEntryRecord)],
    ) -> Result<usize, DbError> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;
        for (context_id, entry) in entries {
            let result = sqlx::query(
                r#"
                INSERT OR IGNORE INTO arp_entries (
                    device_id, context_id, ip_address, mac_address,
                    mac_address_raw, interface, entry_type, captured_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )
            .bind(device_id)
            .bind(context_id)
            .bind(&entry.ip_address)
            .bind(&entry.mac_address)
            .bind(&entry.mac_address_raw)
            .bind(&entry.interface)
            .bind(&entry.entry_type)
            .bind(captured_at)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected() as usize;
        }
        tx.commit().await?;
        Ok(inserted)
    }

    const SIGHTING_SELECT: &'static str = r#"
        SELECT d.hostname, c.context_name AS context, e.ip_address,
               e.mac_address, e.interface, e.captured_at
        FROM arp_entries e
        JOIN devices d ON d.id = e.device_id
        JOIN contexts c ON c.id = e.context_id
    "#;

    fn sighting_from_row(row: &sqlx::sqlite::SqliteRow) -> ArpSighting {
        ArpSighting {
            hostname: row.get("hostname"),
            context: row.get("context"),
            ip_address: row.get("ip_address"),
            mac_address: row.get("mac_address"),
            interface: row.get("interface"),
            captured_at: row.get("captured_at"),
        }
    }

    /// All sightings of a MAC, newest first. Input may be any common MAC
    /// format.
    pub async fn search_mac(&self, mac: &str) -> Result<Vec<ArpSighting>, DbError> {
        let normalized = velocity_protocol::normalize_mac(mac)
            .map_err(|e| DbError::Integrity(e.to_string()))?;
        let sql = format!(
            "{} WHERE e.mac_address = ?1 ORDER BY e.captured_at DESC",
            Self::SIGHTING_SELECT
        );
        let rows = sqlx::query(&sql)
            .bind(&normalized)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(Self::sighting_from_row).collect())
    }

    pub async fn search_ip(&self, ip: &str) -> Result<Vec<ArpSighting>, DbError> {
        let sql = format!(
            "{} WHERE e.ip_address = ?1 ORDER BY e.captured_at DESC",
            Self::SIGHTING_SELECT
        );
        let rows = sqlx::query(&sql)
            .bind(ip.trim())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(Self::sighting_from_row).collect())
    }

    /// Distinct (device, ip) pairs a MAC has appeared on - the mobility
    /// view over the append-only history.
    pub async fn mac_history(&self, mac: &str) -> Result<Vec<ArpSighting>, DbError> {
        let normalized = velocity_protocol::normalize_mac(mac)
            .map_err(|e| DbError::Integrity(e.to_string()))?;
        let sql = format!(
            "{} WHERE e.mac_address = ?1 \
             GROUP BY d.hostname, e.ip_address \
             ORDER BY MAX(e.captured_at) DESC",
            Self::SIGHTING_SELECT
        );
        let rows = sqlx::query(&sql)
            .bind(&normalized)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(Self::sighting_from_row).collect())
    }

    pub async fn entry_count(&self) -> Result<i64, DbError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM arp_entries")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(ip: &str, mac: &str) -> ArpEntryRecord {
        ArpEntryRecord {
            ip_address: ip.into(),
            mac_address: mac.into(),
            mac_address_raw: None,
            interface: Some("Vlan20".into()),
            entry_type: Some("ARPA".into()),
            context: "default".into(),
        }
    }

    #[tokio::test]
    async fn sightings_append_and_search() {
        let db = ArpCatDb::open_in_memory().await.unwrap();
        let dev = db.get_or_create_device("sw1", Some("Cisco"), None).await.unwrap();
        let ctx = db.get_or_create_context(dev, "default", "default").await.unwrap();

        let now = Utc::now();
        db.add_entries(
            dev,
            now,
            &[
                (ctx, entry("10.0.0.5", "aa:bb:cc:dd:ee:ff")),
                (ctx, entry("10.0.0.6", "00:11:22:33:44:55")),
            ],
        )
        .await
        .unwrap();

        // Accepts Cisco-format input for search.
        let hits = db.search_mac("aabb.ccdd.eeff").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].ip_address, "10.0.0.5");

        let hits = db.search_ip("10.0.0.6").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].mac_address, "00:11:22:33:44:55");
    }

    #[tokio::test]
    async fn history_preserves_all_sightings() {
        let db = ArpCatDb::open_in_memory().await.unwrap();
        let dev1 = db.get_or_create_device("sw1", None, None).await.unwrap();
        let dev2 = db.get_or_create_device("sw2", None, None).await.unwrap();
        let ctx1 = db.get_or_create_context(dev1, "default", "default").await.unwrap();
        let ctx2 = db.get_or_create_context(dev2, "default", "default").await.unwrap();

        let mac = "aa:bb:cc:dd:ee:ff";
        db.add_entries(dev1, Utc::now(), &[(ctx1, entry("10.0.0.5", mac))])
            .await
            .unwrap();
        db.add_entries(dev2, Utc::now(), &[(ctx2, entry("10.0.9.5", mac))])
            .await
            .unwrap();

        assert_eq!(db.entry_count().await.unwrap(), 2);
        let history = db.mac_history(mac).await.unwrap();
        assert_eq!(history.len(), 2, "mobility across devices is preserved");
    }

    #[tokio::test]
    async fn context_identity_is_per_device() {
        let db = ArpCatDb::open_in_memory().await.unwrap();
        let dev = db.get_or_create_device("fw1", None, None).await.unwrap();
        let a = db.get_or_create_context(dev, "CUST-A", "vrf").await.unwrap();
        let b = db.get_or_create_context(dev, "CUST-A", "vrf").await.unwrap();
        assert_eq!(a, b);
        let c = db.get_or_create_context(dev, "CUST-B", "vrf").await.unwrap();
        assert_ne!(a, c);
    }
}
