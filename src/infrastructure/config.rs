use crate::domain::overflow::{OverflowConfig, DEFAULT_ITEM_HEIGHT_PX, DEFAULT_OVERFLOW_PADDING_PX};
use crate::infrastructure::error::InfraError;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use url::Url;

const APP_JSON: &str = "app.json";
const CLIENT_JSON: &str = "client.json";
const DEFAULT_REMOTE_BASE_URL: &str = "http://127.0.0.1:3000/api/";

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigBundle {
    pub app: serde_json::Value,
    pub client: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub app_name: String,
    pub timezone: Tz,
    pub bind_address: SocketAddr,
    pub database_file: String,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub remote_base_url: Url,
    pub poll_interval: Duration,
    pub push_debounce: Duration,
    pub notification_interval: Duration,
    pub notification_lead_minutes: i64,
    pub item_height_px: f64,
    pub overflow_padding_px: f64,
    pub timezone: Tz,
}

impl ClientConfig {
    /// Default timings and sizes against the given remote.
    pub fn new(remote_base_url: Url) -> Self {
        Self {
            remote_base_url,
            poll_interval: Duration::from_millis(3000),
            push_debounce: Duration::from_millis(500),
            notification_interval: Duration::from_secs(10),
            notification_lead_minutes: 5,
            item_height_px: DEFAULT_ITEM_HEIGHT_PX,
            overflow_padding_px: DEFAULT_OVERFLOW_PADDING_PX,
            timezone: Tz::UTC,
        }
    }

    pub fn overflow_config(&self) -> OverflowConfig {
        OverflowConfig {
            item_height: self.item_height_px,
            padding: self.overflow_padding_px,
        }
    }
}

fn default_files() -> HashMap<&'static str, serde_json::Value> {
    HashMap::from([
        (
            APP_JSON,
            serde_json::json!({
                "schema": 1,
                "appName": "Statusboard",
                "timezone": "UTC",
                "bindAddress": "127.0.0.1:3000",
                "databaseFile": "statusboard.sqlite"
            }),
        ),
        (
            CLIENT_JSON,
            serde_json::json!({
                "schema": 1,
                "remoteBaseUrl": DEFAULT_REMOTE_BASE_URL,
                "pollIntervalMs": 3000,
                "pushDebounceMs": 500,
                "notificationIntervalSeconds": 10,
                "notificationLeadMinutes": 5,
                "itemHeightPx": 48,
                "overflowPaddingPx": 16
            }),
        ),
    ])
}

pub fn ensure_default_configs(config_dir: &Path) -> Result<(), InfraError> {
    for (name, value) in default_files() {
        let path = config_dir.join(name);
        if !path.exists() {
            let formatted = serde_json::to_string_pretty(&value)?;
            fs::write(path, format!("{formatted}\n"))?;
        }
    }
    Ok(())
}

fn read_config(path: &Path) -> Result<serde_json::Value, InfraError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != 1 {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(parsed)
}

pub fn load_configs(config_dir: &Path) -> Result<ConfigBundle, InfraError> {
    Ok(ConfigBundle {
        app: read_config(&config_dir.join(APP_JSON))?,
        client: read_config(&config_dir.join(CLIENT_JSON))?,
    })
}

fn read_str<'a>(value: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    value
        .get(key)
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn read_u64(value: &serde_json::Value, key: &str, default: u64) -> u64 {
    value
        .get(key)
        .and_then(serde_json::Value::as_u64)
        .unwrap_or(default)
}

fn read_f64(value: &serde_json::Value, key: &str, default: f64) -> f64 {
    value
        .get(key)
        .and_then(serde_json::Value::as_f64)
        .filter(|value| value.is_finite() && *value > 0.0)
        .unwrap_or(default)
}

pub fn parse_timezone(name: &str) -> Result<Tz, InfraError> {
    name.parse::<Tz>()
        .map_err(|error| InfraError::InvalidConfig(format!("unknown timezone '{name}': {error}")))
}

pub fn read_timezone(config_dir: &Path) -> Result<Tz, InfraError> {
    let app = read_config(&config_dir.join(APP_JSON))?;
    parse_timezone(read_str(&app, "timezone").unwrap_or("UTC"))
}

pub fn read_server_config(config_dir: &Path) -> Result<ServerConfig, InfraError> {
    let app = read_config(&config_dir.join(APP_JSON))?;
    let bind_raw = read_str(&app, "bindAddress").unwrap_or("127.0.0.1:3000");
    let bind_address = bind_raw.parse::<SocketAddr>().map_err(|error| {
        InfraError::InvalidConfig(format!("invalid bindAddress '{bind_raw}': {error}"))
    })?;

    Ok(ServerConfig {
        app_name: read_str(&app, "appName").unwrap_or("Statusboard").to_string(),
        timezone: parse_timezone(read_str(&app, "timezone").unwrap_or("UTC"))?,
        bind_address,
        database_file: read_str(&app, "databaseFile")
            .unwrap_or("statusboard.sqlite")
            .to_string(),
    })
}

pub fn read_client_config(config_dir: &Path) -> Result<ClientConfig, InfraError> {
    let client = read_config(&config_dir.join(CLIENT_JSON))?;
    let base_raw = read_str(&client, "remoteBaseUrl").unwrap_or(DEFAULT_REMOTE_BASE_URL);
    // Url::join drops the last segment unless the base ends with '/'.
    let normalized = if base_raw.ends_with('/') {
        base_raw.to_string()
    } else {
        format!("{base_raw}/")
    };
    let remote_base_url = Url::parse(&normalized).map_err(|error| {
        InfraError::InvalidConfig(format!("invalid remoteBaseUrl '{base_raw}': {error}"))
    })?;

    let poll_ms = read_u64(&client, "pollIntervalMs", 3000);
    if poll_ms == 0 {
        return Err(InfraError::InvalidConfig(
            "pollIntervalMs must be > 0".to_string(),
        ));
    }

    Ok(ClientConfig {
        remote_base_url,
        poll_interval: Duration::from_millis(poll_ms),
        push_debounce: Duration::from_millis(read_u64(&client, "pushDebounceMs", 500)),
        notification_interval: Duration::from_secs(
            read_u64(&client, "notificationIntervalSeconds", 10).max(1),
        ),
        notification_lead_minutes: read_u64(&client, "notificationLeadMinutes", 5).max(1) as i64,
        item_height_px: read_f64(&client, "itemHeightPx", DEFAULT_ITEM_HEIGHT_PX),
        overflow_padding_px: read_f64(&client, "overflowPaddingPx", DEFAULT_OVERFLOW_PADDING_PX),
        timezone: read_timezone(config_dir)?,
    })
}
