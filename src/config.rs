//! Configuration management for Shelfscan Server

use std::env;
use std::path::PathBuf;

use crate::ocr::{OcrProvider, OcrServiceConfig};
use crate::session::DEFAULT_PREVIEW_CAPACITY;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub variant: Variant,
    pub ocr: OcrServiceConfig,
    pub storage: StorageConfig,
    pub verification: VerificationConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Number of uploaded images kept for preview
    pub preview_capacity: usize,
}

/// Which front-end flow the server exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// Single-image OCR, no registration
    Basic,
    /// LFL registration, guarded multi-file sessions and history
    Registered,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// JSON file holding registrations; `None` keeps them in memory
    pub blob_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct VerificationConfig {
    /// Code lifetime in seconds; 0 disables expiry
    pub code_ttl_secs: u64,
}

impl VerificationConfig {
    /// Code lifetime, `None` when expiry is off or out of range
    pub fn code_ttl(&self) -> Option<chrono::Duration> {
        match self.code_ttl_secs {
            0 => None,
            secs => i64::try_from(secs).ok().and_then(chrono::Duration::try_seconds),
        }
    }

    /// Reject lifetimes too large to represent
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.code_ttl_secs != 0 && self.code_ttl().is_none() {
            return Err(ConfigError::InvalidValue {
                key: "VERIFICATION_CODE_TTL_SECS",
                value: self.code_ttl_secs.to_string(),
            });
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

impl std::str::FromStr for Variant {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(Self::Basic),
            "registered" => Ok(Self::Registered),
            _ => Err(ConfigError::InvalidValue {
                key: "SHELFSCAN_VARIANT",
                value: s.to_string(),
            }),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
                preview_capacity: DEFAULT_PREVIEW_CAPACITY,
            },
            variant: Variant::Registered,
            ocr: OcrServiceConfig::default(),
            storage: StorageConfig {
                blob_path: Some(PathBuf::from("./shelfscan-store.json")),
            },
            verification: VerificationConfig { code_ttl_secs: 0 },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        let config = Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: parse_var("SERVER_PORT", defaults.server.port)?,
                preview_capacity: parse_var("PREVIEW_CAPACITY", defaults.server.preview_capacity)?,
            },
            variant: match env::var("SHELFSCAN_VARIANT") {
                Ok(value) => value.parse()?,
                Err(_) => defaults.variant,
            },
            ocr: OcrServiceConfig {
                providers: match env::var("OCR_PROVIDERS") {
                    Ok(value) => parse_providers(&value)?,
                    Err(_) => defaults.ocr.providers,
                },
                tesseract_bin: env::var("TESSERACT_BIN").unwrap_or(defaults.ocr.tesseract_bin),
                ollama_url: env::var("OLLAMA_URL").unwrap_or(defaults.ocr.ollama_url),
                ollama_model: env::var("OLLAMA_MODEL").unwrap_or(defaults.ocr.ollama_model),
                default_language: env::var("OCR_LANGUAGE").unwrap_or(defaults.ocr.default_language),
            },
            storage: StorageConfig {
                blob_path: match env::var("BLOB_STORE_PATH") {
                    // Empty value opts into the in-memory store
                    Ok(value) if value.trim().is_empty() => None,
                    Ok(value) => Some(PathBuf::from(value)),
                    Err(_) => defaults.storage.blob_path,
                },
            },
            verification: VerificationConfig {
                code_ttl_secs: parse_var(
                    "VERIFICATION_CODE_TTL_SECS",
                    defaults.verification.code_ttl_secs,
                )?,
            },
        };

        config.verification.validate()?;
        Ok(config)
    }
}

fn parse_var<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        Err(_) => Ok(default),
    }
}

/// Parse a comma-separated provider list, e.g. `tesseract,ollama`
pub fn parse_providers(value: &str) -> Result<Vec<OcrProvider>, ConfigError> {
    value
        .split(',')
        .filter(|part| !part.trim().is_empty())
        .map(|part| {
            part.parse().map_err(|_| ConfigError::InvalidValue {
                key: "OCR_PROVIDERS",
                value: value.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.variant, Variant::Registered);
        assert_eq!(config.ocr.default_language, "jpn+eng");
        assert_eq!(config.verification.code_ttl(), None);
    }

    #[test]
    fn test_parse_providers() {
        assert_eq!(
            parse_providers("tesseract, ollama").unwrap(),
            vec![OcrProvider::Tesseract, OcrProvider::Ollama]
        );
        assert!(parse_providers("").unwrap().is_empty());
        assert!(parse_providers("tesseract,cloud").is_err());
    }

    #[test]
    fn test_variant_from_str() {
        assert_eq!("Basic".parse::<Variant>().unwrap(), Variant::Basic);
        assert!("other".parse::<Variant>().is_err());
    }

    #[test]
    fn test_code_ttl() {
        let config = VerificationConfig { code_ttl_secs: 600 };
        assert_eq!(config.code_ttl(), Some(chrono::Duration::seconds(600)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_code_ttl_out_of_range() {
        let config = VerificationConfig {
            code_ttl_secs: u64::MAX,
        };
        assert_eq!(config.code_ttl(), None);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { key: "VERIFICATION_CODE_TTL_SECS", .. })
        ));

        let largest_i64 = VerificationConfig {
            code_ttl_secs: i64::MAX as u64,
        };
        assert!(largest_i64.validate().is_err());
    }
}
