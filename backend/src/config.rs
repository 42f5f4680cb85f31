use std::{env, fmt::Display, str::FromStr, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

pub const DEFAULT_APP_ID: &str = "school-leave-app";

/// Firebase web-app connection parameters.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirebaseConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub auth_domain: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub storage_bucket: Option<String>,
    #[serde(default)]
    pub messaging_sender_id: Option<String>,
    #[serde(default)]
    pub app_id: Option<String>,
}

impl FirebaseConfig {
    /// Prefers a JSON blob in `FIREBASE_CONFIG`, then the individual variables.
    pub fn new_from_env() -> Self {
        if let Ok(raw) = env::var("FIREBASE_CONFIG") {
            match serde_json::from_str::<FirebaseConfig>(&raw) {
                Ok(config) => return config,
                Err(e) => warn!("FIREBASE_CONFIG is not valid JSON, ignoring it: {}", e),
            }
        }

        Self {
            api_key: non_empty_var("FIREBASE_API_KEY"),
            auth_domain: non_empty_var("FIREBASE_AUTH_DOMAIN"),
            project_id: non_empty_var("FIREBASE_PROJECT_ID"),
            storage_bucket: non_empty_var("FIREBASE_STORAGE_BUCKET"),
            messaging_sender_id: non_empty_var("FIREBASE_MESSAGING_SENDER_ID"),
            app_id: non_empty_var("FIREBASE_APP_ID"),
        }
    }

    /// Without an API key there is no backend at all.
    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub firebase: FirebaseConfig,
    pub app_id: String,
    pub initial_auth_token: Option<String>,
    pub server_addr: String,
    pub sync_interval: Duration,
    pub notification_ttl: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            firebase: FirebaseConfig::new_from_env(),
            app_id: non_empty_var("LEAVE_DESK_APP_ID").unwrap_or_else(|| DEFAULT_APP_ID.to_string()),
            initial_auth_token: non_empty_var("FIREBASE_INITIAL_AUTH_TOKEN"),
            server_addr: try_load("SERVER_ADDR", "127.0.0.1:3000".to_string()),
            sync_interval: Duration::from_secs(try_load_nonzero("SYNC_INTERVAL_SECS", 2)),
            notification_ttl: Duration::from_millis(try_load("NOTIFICATION_TTL_MS", 3000)),
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn try_load_nonzero(key: &str, default: u64) -> u64 {
    match try_load(key, default) {
        0 => {
            warn!("{key} must be greater than zero, using default: {default}");
            default
        }
        value => value,
    }
}

fn try_load<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|e| {
            warn!("Invalid {key} value {raw:?}: {e}, using default: {default}");
            default
        }),
        Err(_) => {
            info!("{key} not set, using default: {default}");
            default
        }
    }
}
