use super::Database;
use crate::cluster::{Device, DomainSegment};
use anyhow::{Context, Result};
use rusqlite::{params, OptionalExtension};

/// Map a row from the devices table into a `Device`.
fn map_device_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Device> {
    let path_json: String = row.get(3)?;
    let failure_domain_path: Vec<DomainSegment> = serde_json::from_str(&path_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Device {
        id: row.get(0)?,
        name: row.get(1)?,
        device_class: row.get(2)?,
        failure_domain_path,
        capacity_bytes: row.get::<_, i64>(4)? as u64,
        used_bytes: row.get::<_, i64>(5)? as u64,
        weight: row.get(6)?,
    })
}

const DEVICE_COLUMNS: &str =
    "id, name, device_class, failure_domain_path, capacity_bytes, used_bytes, weight";

impl Database {
    /// Replace the stored snapshot with `devices` in a single transaction.
    pub fn replace_devices(&self, devices: &[Device]) -> Result<()> {
        let conn = self.conn();
        let tx = conn.unchecked_transaction()?;

        tx.execute("DELETE FROM devices", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO devices \
                 (id, name, device_class, failure_domain_path, capacity_bytes, used_bytes, weight)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for device in devices {
                let path_json = serde_json::to_string(&device.failure_domain_path)
                    .context("Failed to encode failure domain path")?;
                stmt.execute(params![
                    device.id,
                    device.name,
                    device.device_class,
                    path_json,
                    device.capacity_bytes as i64,
                    device.used_bytes as i64,
                    device.weight,
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// Get every device in the current snapshot, ordered by id.
    pub fn get_all_devices(&self) -> Result<Vec<Device>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!("SELECT {DEVICE_COLUMNS} FROM devices ORDER BY id"))?;

        let devices = stmt.query_map([], map_device_row)?.collect::<Result<Vec<_>, _>>()?;

        Ok(devices)
    }

    /// Get a device by its OSD id.
    pub fn get_device(&self, device_id: i64) -> Result<Option<Device>> {
        let conn = self.conn();
        let device = conn
            .query_row(
                &format!("SELECT {DEVICE_COLUMNS} FROM devices WHERE id = ?1"),
                params![device_id],
                map_device_row,
            )
            .optional()?;

        Ok(device)
    }
}
