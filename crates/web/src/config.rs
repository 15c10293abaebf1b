use std::env;

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";
pub const DEFAULT_CLIENT_ID: &str = "web";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebConfig {
    pub bind_address: String,
    /// Tags log lines of writes made through the web client.
    pub client_id: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_owned(),
            client_id: DEFAULT_CLIENT_ID.to_owned(),
        }
    }
}

impl WebConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            bind_address: lookup("DISPATCH_BIND_ADDRESS").unwrap_or(defaults.bind_address),
            client_id: lookup("DISPATCH_CLIENT_ID").unwrap_or(defaults.client_id),
        }
    }
}
