//! Content types and their codecs

use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// How a file's bytes map to a structured value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentType {
    Json,
    Yaml,
    #[default]
    Text,
}

impl ContentType {
    /// Infer the content type from a file extension, falling back to text
    pub fn infer(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
            .as_deref()
        {
            Some("json") => ContentType::Json,
            Some("yaml") | Some("yml") => ContentType::Yaml,
            _ => ContentType::Text,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::Json => "json",
            ContentType::Yaml => "yaml",
            ContentType::Text => "text",
        }
    }

    /// Decode raw bytes into a value
    pub fn decode(self, bytes: &[u8]) -> Result<Value, String> {
        match self {
            ContentType::Json => {
                if bytes.iter().all(u8::is_ascii_whitespace) {
                    return Ok(Value::Null);
                }
                serde_json::from_slice(bytes).map_err(|e| e.to_string())
            }
            ContentType::Yaml => {
                if bytes.iter().all(u8::is_ascii_whitespace) {
                    return Ok(Value::Null);
                }
                serde_yaml::from_slice(bytes).map_err(|e| e.to_string())
            }
            ContentType::Text => std::str::from_utf8(bytes)
                .map(|s| Value::String(s.to_string()))
                .map_err(|e| e.to_string()),
        }
    }

    /// Encode a value into bytes
    pub fn encode(self, value: &Value) -> Result<Vec<u8>, String> {
        match self {
            ContentType::Json => {
                let mut out = serde_json::to_vec_pretty(value).map_err(|e| e.to_string())?;
                out.push(b'\n');
                Ok(out)
            }
            ContentType::Yaml => serde_yaml::to_string(value)
                .map(String::into_bytes)
                .map_err(|e| e.to_string()),
            ContentType::Text => Ok(match value {
                Value::String(s) => s.clone().into_bytes(),
                Value::Null => Vec::new(),
                other => other.to_string().into_bytes(),
            }),
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(ContentType::Json),
            "yaml" | "yml" => Ok(ContentType::Yaml),
            "text" | "txt" => Ok(ContentType::Text),
            other => Err(format!(
                "unknown content type `{}` (expected json, yaml or text)",
                other
            )),
        }
    }
}
