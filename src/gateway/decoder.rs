//! Decoding of the runtime configuration source.
//!
//! A source is a URL carrying a `config` query parameter whose value is
//! base64-encoded JSON of the form `{ "walletCredential": "...", "rpcApiKey": "..." }`.

use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine,
};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value};
use thiserror::Error;
use url::Url;

/// Name of the query parameter holding the encoded document.
pub const CONFIG_PARAM: &str = "config";

// Clients are inconsistent about padding, so accept both forms.
const LENIENT_STANDARD: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);
const LENIENT_URL_SAFE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("malformed configuration source: {0}")]
    MalformedSource(String),
    #[error("configuration source has no 'config' query parameter")]
    MissingConfigParameter,
    #[error("configuration parameter is not valid base64: {0}")]
    InvalidEncoding(String),
    #[error("configuration document is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("configuration is incomplete: {0}")]
    IncompleteConfig(String),
}

impl ConfigError {
    /// Stable machine-readable kind, surfaced to protocol clients.
    pub fn kind(&self) -> &'static str {
        match self {
            ConfigError::MalformedSource(_) => "malformed_source",
            ConfigError::MissingConfigParameter => "missing_config_parameter",
            ConfigError::InvalidEncoding(_) => "invalid_encoding",
            ConfigError::InvalidJson(_) => "invalid_json",
            ConfigError::IncompleteConfig(_) => "incomplete_config",
        }
    }
}

/// Validated runtime configuration. Replaced wholesale on reconfiguration.
#[derive(Debug)]
pub struct RuntimeConfig {
    wallet_credential: SecretString,
    rpc_api_key: String,
}

impl RuntimeConfig {
    pub fn new(
        wallet_credential: impl Into<String>,
        rpc_api_key: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let wallet_credential = wallet_credential.into();
        let rpc_api_key = rpc_api_key.into();
        if wallet_credential.trim().is_empty() {
            return Err(ConfigError::IncompleteConfig(
                "walletCredential is required".to_string(),
            ));
        }
        if rpc_api_key.trim().is_empty() {
            return Err(ConfigError::IncompleteConfig("rpcApiKey is required".to_string()));
        }
        Ok(Self {
            wallet_credential: SecretString::new(wallet_credential),
            rpc_api_key,
        })
    }

    pub fn wallet_credential(&self) -> &SecretString {
        &self.wallet_credential
    }

    pub fn rpc_api_key(&self) -> &str {
        &self.rpc_api_key
    }
}

impl PartialEq for RuntimeConfig {
    fn eq(&self, other: &Self) -> bool {
        self.rpc_api_key == other.rpc_api_key
            && self.wallet_credential.expose_secret() == other.wallet_credential.expose_secret()
    }
}

impl Eq for RuntimeConfig {}

/// Decodes and validates a configuration source. Pure; the caller decides what
/// to do with prior state on failure.
pub fn decode(source: &str) -> Result<RuntimeConfig, ConfigError> {
    let url = Url::parse(source.trim()).map_err(|e| ConfigError::MalformedSource(e.to_string()))?;

    let encoded = url
        .query_pairs()
        .find(|(key, _)| key == CONFIG_PARAM)
        .map(|(_, value)| value.into_owned())
        .ok_or(ConfigError::MissingConfigParameter)?;

    let bytes = decode_base64(&encoded)?;

    // Only syntax errors are InvalidJson; a document of the wrong shape is
    // incomplete.
    let doc: Value =
        serde_json::from_slice(&bytes).map_err(|e| ConfigError::InvalidJson(e.to_string()))?;
    let fields = doc.as_object().ok_or_else(|| {
        ConfigError::IncompleteConfig("configuration must be a JSON object".to_string())
    })?;

    RuntimeConfig::new(
        string_field(fields, "walletCredential")?,
        string_field(fields, "rpcApiKey")?,
    )
}

fn string_field(fields: &Map<String, Value>, name: &str) -> Result<String, ConfigError> {
    match fields.get(name) {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(ConfigError::IncompleteConfig(format!("{} must be a string", name))),
    }
}

fn decode_base64(encoded: &str) -> Result<Vec<u8>, ConfigError> {
    // Form decoding of the query string turns '+' into ' '.
    let cleaned: String = encoded.trim().replace(' ', "+");
    if cleaned.is_empty() {
        return Err(ConfigError::InvalidEncoding("parameter is empty".to_string()));
    }
    LENIENT_STANDARD
        .decode(&cleaned)
        .or_else(|e| LENIENT_URL_SAFE.decode(&cleaned).map_err(|_| e))
        .map_err(|e| ConfigError::InvalidEncoding(e.to_string()))
}
