//! souk.json configuration parsing, the fallback when no souk.toml exists

use souk_core::error::SoukError;

use crate::toml::{validate_config, SoukConfig};
use crate::ConfigResult;

/// Parse JSON string to SoukConfig configuration
pub fn parse_souk_json(content: &str) -> ConfigResult<SoukConfig> {
    let config: SoukConfig = serde_json::from_str(content).map_err(|e| SoukError::JsonParse {
        message: format!("JSON parsing error: {}", e),
    })?;

    validate_config(&config)?;

    Ok(config)
}

/// Load and parse souk.json from file path
pub async fn load_from_file(path: &camino::Utf8Path) -> ConfigResult<SoukConfig> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| SoukError::io(format!("Failed to read {}", path), e))?;

    parse_souk_json(&content).map_err(|e| match e {
        SoukError::JsonParse { message } => SoukError::JsonParse {
            message: format!("In file {}: {}", path, message),
        },
        other => other,
    })
}
