//! Store and server configuration.

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Configuration for a burrow store and its HTTP surface.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct StoreConfig {
    /// Sandbox root directory.
    pub root: PathBuf,

    /// Address the HTTP server binds to.
    #[builder(default = "default_bind_address()")]
    #[serde(default = "default_bind_address")]
    pub bind_address: IpAddr,

    /// Port the HTTP server binds to (0 = auto-assign).
    #[builder(default = "3000")]
    #[serde(default = "default_port")]
    pub port: u16,

    /// Enable archive extraction when the capability is compiled in.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub archives_enabled: bool,

    /// Display name of the root node in folder trees.
    #[builder(default = "default_root_label()")]
    #[serde(default = "default_root_label")]
    pub root_label: String,

    /// Seconds a finished upload record stays visible.
    #[builder(default = "5")]
    #[serde(default = "default_upload_expiry_secs")]
    pub upload_expiry_secs: u64,

    /// Maximum size of a buffered JSON request body.
    #[builder(default = "default_max_body_bytes()")]
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_bind_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

fn default_port() -> u16 {
    3000
}

fn default_true() -> bool {
    true
}

fn default_root_label() -> String {
    "Home".to_string()
}

fn default_upload_expiry_secs() -> u64 {
    5
}

fn default_max_body_bytes() -> usize {
    64 * 1024 * 1024
}

impl StoreConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(ref root) = self.root {
            if root.as_os_str().is_empty() {
                return Err("Root path cannot be empty".to_string());
            }
        } else {
            return Err("Root path is required".to_string());
        }
        if let Some(ref label) = self.root_label {
            if label.trim().is_empty() {
                return Err("Root label cannot be empty".to_string());
            }
        }
        Ok(())
    }
}

impl StoreConfig {
    /// Create a new config builder.
    pub fn builder() -> StoreConfigBuilder {
        StoreConfigBuilder::default()
    }

    /// Create a config with defaults for everything but the root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            bind_address: default_bind_address(),
            port: default_port(),
            archives_enabled: true,
            root_label: default_root_label(),
            upload_expiry_secs: default_upload_expiry_secs(),
            max_body_bytes: default_max_body_bytes(),
        }
    }

    /// How long finished upload records linger.
    pub fn upload_expiry(&self) -> Duration {
        Duration::from_secs(self.upload_expiry_secs)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new("./storage")
    }
}
