//! Secret storage using the OS credential store.
//!
//! On Windows this uses DPAPI (via the `keyring` crate), on macOS Keychain,
//! and on Linux the kernel keyutils store. Only the analyst API key lives
//! here; PINs are hashed into the local database instead.

use keyring::Entry;
use tracing::{info, warn};

use crate::config;
use crate::error::{PosError, PosResult};

const SERVICE_NAME: &str = "tokosheet-pos";

pub const KEY_ANALYST_API_KEY: &str = "analyst_api_key";

/// Retrieve a single credential from the OS keyring. Returns `None` when the
/// entry does not exist (or the platform returns a "not found" error).
pub fn get_credential(key: &str) -> Option<String> {
    let entry = match Entry::new(SERVICE_NAME, key) {
        Ok(e) => e,
        Err(e) => {
            warn!(key, error = %e, "keyring: failed to create entry");
            return None;
        }
    };
    match entry.get_password() {
        Ok(pw) => Some(pw),
        Err(keyring::Error::NoEntry) => None,
        Err(e) => {
            warn!(key, error = %e, "keyring: failed to read credential");
            None
        }
    }
}

/// Store a credential in the OS keyring.
pub fn set_credential(key: &str, value: &str) -> PosResult<()> {
    let entry = Entry::new(SERVICE_NAME, key).map_err(|e| PosError::Storage(e.to_string()))?;
    entry
        .set_password(value)
        .map_err(|e| PosError::Storage(e.to_string()))?;
    Ok(())
}

/// Delete a credential from the OS keyring. Silently succeeds if the entry
/// does not exist.
pub fn delete_credential(key: &str) -> PosResult<()> {
    let entry = Entry::new(SERVICE_NAME, key).map_err(|e| PosError::Storage(e.to_string()))?;
    match entry.delete_credential() {
        Ok(()) => Ok(()),
        Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => Err(PosError::Storage(e.to_string())),
    }
}

/// The analyst API key: keyring first, then `GEMINI_API_KEY` / `API_KEY`.
pub fn analyst_api_key() -> Option<String> {
    get_credential(KEY_ANALYST_API_KEY)
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .or_else(config::analyst_api_key_from_env)
}

/// Save (or clear, when blank) the analyst API key.
pub fn save_analyst_api_key(value: &str) -> PosResult<()> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        info!("clearing analyst API key");
        return delete_credential(KEY_ANALYST_API_KEY);
    }
    set_credential(KEY_ANALYST_API_KEY, trimmed)?;
    info!("analyst API key updated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    // Containers and headless CI often have no usable keyring; those runs
    // only check that a missing backend is reported, not panicked on.
    fn keyring_available(key: &str) -> bool {
        match set_credential(key, "initial") {
            Ok(()) => true,
            Err(e) => {
                eprintln!("keyring unavailable, skipping: {e}");
                false
            }
        }
    }

    #[test]
    #[serial]
    fn credential_set_get_delete() {
        let key = format!("test_{}", uuid::Uuid::new_v4());
        if !keyring_available(&key) {
            assert_eq!(get_credential(&key), None);
            return;
        }
        set_credential(&key, "secret-1").expect("overwrite");
        assert_eq!(get_credential(&key).as_deref(), Some("secret-1"));

        delete_credential(&key).expect("delete");
        assert_eq!(get_credential(&key), None);
        delete_credential(&key).expect("deleting a missing entry is not an error");
    }
}
