// API key lookup: process environment first, then the secrets file.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::SecretsError;

/// Flat `KEY = "value"` table read from a TOML secrets file.
#[derive(Default, Clone)]
pub struct SecretStore {
    values: HashMap<String, String>,
}

// Never print secret values.
impl fmt::Debug for SecretStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&String> = self.values.keys().collect();
        keys.sort();
        f.debug_struct("SecretStore").field("keys", &keys).finish()
    }
}

impl SecretStore {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parses top-level string entries. Tables and non-string values are skipped.
    pub fn from_toml_str(source: &str, path: &str) -> Result<Self, SecretsError> {
        let table = source.parse::<toml::Table>().map_err(|source| SecretsError::Parse {
            path: path.to_string(),
            source,
        })?;

        let values = table
            .into_iter()
            .filter_map(|(key, value)| match value {
                toml::Value::String(s) => Some((key, s)),
                _ => None,
            })
            .collect();
        Ok(Self { values })
    }

    /// Reads a secrets file. A missing file is an empty store.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SecretsError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_toml_str(&contents, &display),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No secrets file at {}", path.display());
                Ok(Self::empty())
            }
            Err(source) => Err(SecretsError::Io {
                path: display,
                source,
            }),
        }
    }

    /// Like [`SecretStore::load`], but a broken file is logged and treated as empty.
    pub fn load_or_empty(path: impl AsRef<Path>) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            warn!("Ignoring secrets file: {}", e);
            Self::empty()
        })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

type EnvLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Resolves one named credential.
pub struct CredentialSource {
    name: String,
    env: EnvLookup,
    secrets: SecretStore,
}

impl fmt::Debug for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialSource")
            .field("name", &self.name)
            .field("secrets", &self.secrets)
            .finish_non_exhaustive()
    }
}

impl CredentialSource {
    /// Reads `name` from the real process environment, then from `secrets`.
    pub fn new(name: impl Into<String>, secrets: SecretStore) -> Self {
        Self {
            name: name.into(),
            env: Box::new(|key| std::env::var(key).ok()),
            secrets,
        }
    }

    /// Replaces the environment lookup, mostly for tests.
    pub fn with_env_lookup(
        mut self,
        lookup: impl Fn(&str) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.env = Box::new(lookup);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// An empty environment value counts as unset.
    pub fn resolve(&self) -> Option<String> {
        if let Some(value) = (self.env)(&self.name).filter(|v| !v.is_empty()) {
            debug!("Using {} from the environment", self.name);
            return Some(value);
        }
        let from_store = self
            .secrets
            .get(&self.name)
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        if from_store.is_some() {
            debug!("Using {} from the secrets file", self.name);
        }
        from_store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_environment_wins_over_secrets() {
        let secrets = SecretStore::from_toml_str("GROQ_API_KEY = \"from-file\"", "inline").unwrap();
        let source = CredentialSource::new("GROQ_API_KEY", secrets)
            .with_env_lookup(|key| (key == "GROQ_API_KEY").then(|| "from-env".to_string()));
        assert_eq!(source.resolve().as_deref(), Some("from-env"));
    }

    #[test]
    fn test_falls_back_to_secrets_when_env_missing_or_empty() {
        let secrets = SecretStore::from_toml_str("GROQ_API_KEY = \"from-file\"", "inline").unwrap();

        let source = CredentialSource::new("GROQ_API_KEY", secrets.clone()).with_env_lookup(no_env);
        assert_eq!(source.resolve().as_deref(), Some("from-file"));

        let source = CredentialSource::new("GROQ_API_KEY", secrets)
            .with_env_lookup(|_| Some(String::new()));
        assert_eq!(source.resolve().as_deref(), Some("from-file"));
    }

    #[test]
    fn test_nothing_resolves() {
        let source = CredentialSource::new("GROQ_API_KEY", SecretStore::empty()).with_env_lookup(no_env);
        assert!(source.resolve().is_none());
    }

    #[test]
    fn test_load_secrets_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("secrets.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "GROQ_API_KEY = \"gsk_test\"").unwrap();
        writeln!(file, "RETRIES = 3").unwrap();
        writeln!(file, "[section]").unwrap();
        writeln!(file, "nested = \"ignored\"").unwrap();
        drop(file);

        let store = SecretStore::load(&path).unwrap();
        assert_eq!(store.get("GROQ_API_KEY"), Some("gsk_test"));
        assert_eq!(store.get("RETRIES"), None);
        assert_eq!(store.get("nested"), None);
    }

    #[test]
    fn test_missing_file_is_empty_and_broken_file_errors() {
        let dir = TempDir::new().unwrap();
        let store = SecretStore::load(dir.path().join("absent.toml")).unwrap();
        assert!(store.get("GROQ_API_KEY").is_none());

        let broken = dir.path().join("broken.toml");
        std::fs::write(&broken, "GROQ_API_KEY = ").unwrap();
        assert!(matches!(SecretStore::load(&broken), Err(SecretsError::Parse { .. })));
        assert!(SecretStore::load_or_empty(&broken).get("GROQ_API_KEY").is_none());
    }

    #[test]
    fn test_debug_hides_values() {
        let store = SecretStore::from_toml_str("GROQ_API_KEY = \"gsk_secret\"", "inline").unwrap();
        let printed = format!("{:?}", store);
        assert!(printed.contains("GROQ_API_KEY"));
        assert!(!printed.contains("gsk_secret"));
    }
}
