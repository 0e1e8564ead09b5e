/*
[INPUT]:  Wallet label and key storage directory
[OUTPUT]: Persistent local keypair wallets
[POS]:    Auth layer - persistent storage for development wallets
[UPDATE]: When key storage format or file naming conventions change
*/

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::auth::KeypairWallet;

const KEY_FILE_SUFFIX: &str = "_wallet.key";

/// Manages persistence of local wallet seeds, one file per label
#[derive(Debug, Clone)]
pub struct WalletKeyStore {
    key_dir: PathBuf,
}

impl WalletKeyStore {
    /// Create a new key store with the given storage directory
    pub fn new(key_dir: impl AsRef<Path>) -> Self {
        Self {
            key_dir: key_dir.as_ref().to_path_buf(),
        }
    }

    pub fn key_dir(&self) -> &Path {
        &self.key_dir
    }

    /// Get an existing wallet or create a new one if it doesn't exist
    pub fn get_or_create_wallet(&self, label: &str) -> io::Result<KeypairWallet> {
        if let Some(wallet) = self.load_wallet(label)? {
            Ok(wallet)
        } else {
            let wallet = KeypairWallet::generate();
            self.save_wallet(label, &wallet)?;
            Ok(wallet)
        }
    }

    /// Load the wallet stored under `label`
    ///
    /// A missing file is `Ok(None)`; an unreadable or corrupt one is an error
    /// so it is never silently replaced by a fresh key.
    pub fn load_wallet(&self, label: &str) -> io::Result<Option<KeypairWallet>> {
        validate_label(label)?;
        let path = self.key_file_path(label);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err),
        };

        KeypairWallet::new(content.trim())
            .map(Some)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))
    }

    /// Save a wallet seed to disk under `label`
    pub fn save_wallet(&self, label: &str, wallet: &KeypairWallet) -> io::Result<()> {
        validate_label(label)?;
        if !self.key_dir.exists() {
            fs::create_dir_all(&self.key_dir)?;
        }

        let path = self.key_file_path(label);
        fs::write(&path, wallet.secret_key_base58())?;
        restrict_permissions(&path)?;

        Ok(())
    }

    /// List all labels that have stored wallets
    pub fn list_labels(&self) -> Vec<String> {
        let mut labels = Vec::new();
        if let Ok(entries) = fs::read_dir(&self.key_dir) {
            for entry in entries.flatten() {
                if let Some(name) = entry.file_name().to_str() {
                    if let Some(label) = name.strip_suffix(KEY_FILE_SUFFIX) {
                        labels.push(label.to_string());
                    }
                }
            }
        }
        labels.sort();
        labels
    }

    /// Get the expected file path for a label's key
    pub fn key_file_path(&self, label: &str) -> PathBuf {
        self.key_dir.join(format!("{label}{KEY_FILE_SUFFIX}"))
    }
}

fn validate_label(label: &str) -> io::Result<()> {
    let valid = !label.is_empty()
        && label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("wallet label {label:?} must be non-empty [A-Za-z0-9_-]"),
        ))
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(0o600);
    fs::set_permissions(path, perms)
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> io::Result<()> {
    Ok(())
}
