use anyhow::{Result, anyhow};
use tracing::{debug, error};

use crate::models::ServerProfile;

const KEYRING_SERVICE: &str = "reeltok";

/// Keyring account for one login: server type, user and server URL.
pub fn token_key(profile: &ServerProfile) -> String {
    format!(
        "{}:{}@{}",
        profile.server_type,
        profile.username,
        profile.base_url()
    )
}

/// Store the profile's access token in the system keyring
pub fn store_token(profile: &ServerProfile) -> Result<()> {
    let key = token_key(profile);
    match keyring::Entry::new(KEYRING_SERVICE, &key) {
        Ok(entry) => {
            entry.set_password(&profile.token)?;
            debug!("Stored token for {}", key);
            Ok(())
        }
        Err(e) => {
            error!("Failed to create keyring entry: {}", e);
            Err(anyhow!("Failed to store credentials"))
        }
    }
}

/// Retrieve the access token saved for `profile`
pub fn load_token(profile: &ServerProfile) -> Result<String> {
    let key = token_key(profile);
    match keyring::Entry::new(KEYRING_SERVICE, &key) {
        Ok(entry) => Ok(entry.get_password()?),
        Err(e) => {
            error!("Failed to get keyring entry: {}", e);
            Err(anyhow!("Failed to retrieve credentials"))
        }
    }
}

pub fn delete_token(profile: &ServerProfile) {
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &token_key(profile)) {
        // Missing entries are fine.
        let _ = entry.delete_credential();
    }
}
