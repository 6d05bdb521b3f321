use crate::core::DEFAULT_TEMP_ID_PREFIX;

/// Store configuration
///
/// Names are used in log fields and in user-facing error messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Singular resource name ("task")
    pub resource_name: String,

    /// Plural resource name ("tasks")
    pub collection_name: String,

    /// Prefix marking placeholder ids of optimistic creates
    pub temp_id_prefix: String,
}

impl StoreConfig {
    /// Create a configuration for a resource
    pub fn new(resource_name: &str, collection_name: &str) -> Self {
        Self {
            resource_name: resource_name.to_string(),
            collection_name: collection_name.to_string(),
            temp_id_prefix: DEFAULT_TEMP_ID_PREFIX.to_string(),
        }
    }

    /// Set the placeholder id prefix
    pub fn temp_id_prefix(mut self, prefix: &str) -> Self {
        self.temp_id_prefix = prefix.to_string();
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.resource_name.trim().is_empty() {
            return Err("resource_name cannot be empty".to_string());
        }

        if self.collection_name.trim().is_empty() {
            return Err("collection_name cannot be empty".to_string());
        }

        if self.temp_id_prefix.is_empty() {
            return Err("temp_id_prefix cannot be empty".to_string());
        }

        Ok(())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new("task", "tasks")
    }
}
