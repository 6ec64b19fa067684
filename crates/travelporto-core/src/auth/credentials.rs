use anyhow::{Context, Result};
use keyring::Entry;

const SERVICE_NAME: &str = "travelporto";

/// Keychain account the API key is stored under
const ACCOUNT_NAME: &str = "api-key";

pub struct ApiKeyStore;

impl ApiKeyStore {
    fn entry() -> Result<Entry> {
        Entry::new(SERVICE_NAME, ACCOUNT_NAME).context("Failed to create keyring entry")
    }

    /// Store the API key in the OS keychain
    pub fn store(api_key: &str) -> Result<()> {
        let trimmed = api_key.trim();
        if trimmed.is_empty() {
            anyhow::bail!("API key is empty");
        }
        Self::entry()?
            .set_password(trimmed)
            .context("Failed to store API key in keychain")
    }

    /// Retrieve the API key from the OS keychain
    pub fn get() -> Result<String> {
        Self::entry()?
            .get_password()
            .context("Failed to retrieve API key from keychain")
    }

    /// Delete the stored API key
    pub fn delete() -> Result<()> {
        Self::entry()?
            .delete_credential()
            .context("Failed to delete API key from keychain")
    }

    pub fn has_key() -> bool {
        Self::get().is_ok()
    }
}
