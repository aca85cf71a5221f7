use std::path::Path;

use tracing::debug;
use uuid::Uuid;

use crate::errors::Result;

#[cfg(unix)]
const MACHINE_ID_PATHS: &[&str] = &["/etc/machine-id", "/var/lib/dbus/machine-id"];

const SERIAL_FILE: &str = "device_serial";

/// Stable 128-bit device serial, rendered as 32 lowercase hex characters.
///
/// Prefers the OS machine id where one exists; otherwise a serial is generated
/// once and persisted under `storage_dir`, so it stays stable across runs on
/// the same install. It is sent to the service as a hardware identifier, not
/// kept as a secret, and carries no user-specific data.
pub fn machine_serial(storage_dir: &Path) -> Result<String> {
    #[cfg(unix)]
    for path in MACHINE_ID_PATHS {
        if let Ok(contents) = std::fs::read_to_string(path) {
            if let Some(id) = normalize(&contents) {
                return Ok(id);
            }
        }
    }

    persisted_serial(storage_dir)
}

fn normalize(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (trimmed.len() == 32 && trimmed.bytes().all(|b| b.is_ascii_hexdigit()))
        .then(|| trimmed.to_ascii_lowercase())
}

fn persisted_serial(storage_dir: &Path) -> Result<String> {
    let path = storage_dir.join(SERIAL_FILE);

    if let Ok(contents) = std::fs::read_to_string(&path) {
        if let Some(id) = normalize(&contents) {
            return Ok(id);
        }
    }

    let serial = Uuid::new_v4().simple().to_string();
    debug!("generated new device serial");
    std::fs::create_dir_all(storage_dir)?;
    std::fs::write(&path, &serial)?;
    Ok(serial)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn persisted_serial_is_stable_across_calls() {
        let dir = TempDir::new().unwrap();
        let first = persisted_serial(dir.path()).unwrap();
        let second = persisted_serial(dir.path()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn serial_is_32_hex_chars() {
        let dir = TempDir::new().unwrap();
        let serial = machine_serial(dir.path()).unwrap();
        assert_eq!(serial.len(), 32);
        assert!(serial.bytes().all(|b| b.is_ascii_hexdigit()));
        assert_eq!(serial, serial.to_ascii_lowercase());
    }
}
