//! OAuth client-secret loading behind a [`SecretProvider`], so the credential source (file, env, ...)
//! can change without touching the bot.

use std::env;
use std::fmt;
use std::fs;
use std::path::PathBuf;

use serde::Deserialize;

use crate::config::ConfigError;

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// Credentials used to obtain bearer tokens from the OAuth token endpoint.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct ClientSecret {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub project_id: Option<String>,
}

impl fmt::Debug for ClientSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSecret")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("token_uri", &self.token_uri)
            .field("project_id", &self.project_id)
            .finish()
    }
}

/// Accepted file layouts: Google's `installed` / `web` wrappers or the bare object.
#[derive(Deserialize)]
#[serde(untagged)]
enum ClientSecretFile {
    Installed { installed: ClientSecret },
    Web { web: ClientSecret },
    Flat(ClientSecret),
}

/// Parses client-secret JSON. `origin` names the source in error messages.
pub fn parse_client_secret(json: &str, origin: &str) -> Result<ClientSecret, ConfigError> {
    let file: ClientSecretFile =
        serde_json::from_str(json).map_err(|e| ConfigError::MalformedSecret {
            origin: origin.to_string(),
            reason: e.to_string(),
        })?;
    let secret = match file {
        ClientSecretFile::Installed { installed } => installed,
        ClientSecretFile::Web { web } => web,
        ClientSecretFile::Flat(secret) => secret,
    };
    if secret.client_id.trim().is_empty() || secret.client_secret.trim().is_empty() {
        return Err(ConfigError::MalformedSecret {
            origin: origin.to_string(),
            reason: "client_id and client_secret must not be empty".to_string(),
        });
    }
    Ok(secret)
}

pub trait SecretProvider: Send + Sync {
    /// Where the secret comes from, for logs. Never includes the secret itself.
    fn describe(&self) -> String;
    fn client_secret(&self) -> Result<ClientSecret, ConfigError>;
}

/// Reads the secret from a JSON file on disk.
#[derive(Debug, Clone)]
pub struct FileSecretProvider {
    path: PathBuf,
}

impl FileSecretProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SecretProvider for FileSecretProvider {
    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }

    fn client_secret(&self) -> Result<ClientSecret, ConfigError> {
        let origin = self.path.display().to_string();
        let json = fs::read_to_string(&self.path).map_err(|source| ConfigError::CredentialFile {
            path: origin.clone(),
            source,
        })?;
        parse_client_secret(&json, &origin)
    }
}

/// Reads the secret JSON from an environment variable.
#[derive(Debug, Clone)]
pub struct EnvSecretProvider {
    var: String,
}

impl EnvSecretProvider {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl SecretProvider for EnvSecretProvider {
    fn describe(&self) -> String {
        format!("env {}", self.var)
    }

    fn client_secret(&self) -> Result<ClientSecret, ConfigError> {
        let json = env::var(&self.var).map_err(|_| ConfigError::Missing(self.var.clone()))?;
        parse_client_secret(&json, &self.var)
    }
}
