use reqwest::Url;
use std::time::Duration;

/// HTTP backend configuration
///
/// A resource lives at `{base_url}/{resource_path}`; single entities at
/// `{base_url}/{resource_path}/{id}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRemoteConfig {
    /// API root, e.g. `http://localhost:3000/api`
    pub base_url: String,

    /// Collection path below the API root, e.g. `tasks`
    pub resource_path: String,

    /// Per-request timeout
    pub timeout: Duration,

    /// Bearer token attached to every request
    pub auth_token: Option<String>,
}

impl HttpRemoteConfig {
    /// Create a new HTTP backend configuration
    pub fn new(base_url: &str, resource_path: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            resource_path: resource_path.trim_matches('/').to_string(),
            timeout: Duration::from_secs(30),
            auth_token: None,
        }
    }

    /// Set request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the bearer token
    pub fn auth_token(mut self, token: &str) -> Self {
        self.auth_token = Some(token.to_string());
        self
    }

    /// Parse from a resource URL
    ///
    /// The last path segment is the resource, everything before it is the
    /// API root.
    ///
    /// # Examples
    ///
    /// ```
    /// # use taskstate::HttpRemoteConfig;
    /// let config = HttpRemoteConfig::from_url("http://localhost:3000/api/tasks").unwrap();
    /// assert_eq!(config.base_url, "http://localhost:3000/api");
    /// assert_eq!(config.resource_path, "tasks");
    /// ```
    pub fn from_url(url: &str) -> Result<Self, String> {
        let parsed = Url::parse(url).map_err(|err| format!("Invalid URL: {err}"))?;

        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err("URL must start with 'http://' or 'https://'".to_string());
        }

        let trimmed = url.trim_end_matches('/');
        let Some((base, resource)) = trimmed.rsplit_once('/') else {
            return Err("Invalid URL format".to_string());
        };

        if resource.is_empty() || parsed.path().trim_matches('/').is_empty() {
            return Err("URL must name a resource path".to_string());
        }

        Ok(Self::new(base, resource))
    }

    /// Full collection URL
    pub fn collection_url(&self) -> String {
        format!("{}/{}", self.base_url, self.resource_path)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        Url::parse(&self.base_url).map_err(|err| format!("Invalid base_url: {err}"))?;

        if self.resource_path.is_empty() {
            return Err("resource_path cannot be empty".to_string());
        }

        if self.timeout.is_zero() {
            return Err("timeout must be > 0".to_string());
        }

        if matches!(&self.auth_token, Some(token) if token.trim().is_empty()) {
            return Err("auth_token cannot be blank".to_string());
        }

        Ok(())
    }
}

impl Default for HttpRemoteConfig {
    fn default() -> Self {
        Self::new("http://localhost:3000/api", "tasks")
    }
}
