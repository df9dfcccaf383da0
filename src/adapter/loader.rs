//! Adapter definitions from YAML or JSON files.
//!
//! Only the declarative part of an adapter lives in a file; handlers are attached
//! in code with [`Adapter::with_handlers`].

use std::path::Path;

use super::Adapter;
use crate::{Error, ErrorContext, Result};

impl Adapter {
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let adapter: Adapter = serde_yaml::from_str(content)?;
        adapter.normalized("yaml")
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let adapter: Adapter = serde_json::from_str(content)?;
        adapter.normalized("json")
    }

    /// Load an adapter definition, choosing the format from the file extension
    /// (`.json`, otherwise YAML).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            Error::configuration_with_context(
                format!("failed to read adapter definition: {}", e),
                ErrorContext::new()
                    .with_details(path.display().to_string()),
            )
        })?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_yaml_str(&content)
        }
    }

    fn normalized(mut self, format: &str) -> Result<Self> {
        if self.name.trim().is_empty() {
            return Err(Error::validation_with_context(
                "adapter name must be non-empty",
                ErrorContext::new()
                    .with_field_path("adapter.name")
                    .with_details(format!("{} definition", format)),
            ));
        }
        if self.url.trim().is_empty() {
            return Err(Error::validation_with_context(
                "adapter url must be non-empty",
                ErrorContext::new()
                    .with_adapter(self.name.clone())
                    .with_field_path("adapter.url")
                    .with_details(format!("{} definition", format)),
            ));
        }
        if self.formatted_name.is_empty() {
            self.formatted_name = self.name.clone();
        }
        Ok(self)
    }
}
