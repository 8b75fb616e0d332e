//! Push notifications.
//!
//! A push payload is JSON `{"title", "body", "primaryKey"?}`. Any other
//! payload text is shown as the notification body; a missing payload shows the
//! application name alone.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tally_core::Error;

/// Display settings shared by every notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationConfig {
    pub app_name: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    pub default_primary_key: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PushPayload {
    title: Option<String>,
    body: Option<String>,
    primary_key: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationData {
    /// Milliseconds since the Unix epoch.
    pub date_of_arrival: i64,
    pub primary_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    pub data: NotificationData,
}

fn decode(payload: Option<&str>) -> Result<PushPayload, Error> {
    let Some(text) = payload else {
        return Ok(PushPayload::default());
    };

    match serde_json::from_str::<Value>(text) {
        Ok(value @ Value::Object(_)) => {
            serde_json::from_value(value).map_err(|e| Error::InvalidPayload(format!("push payload: {e}")))
        }
        Ok(Value::String(body)) => Ok(PushPayload { body: Some(body), ..Default::default() }),
        _ => Ok(PushPayload { body: Some(text.to_string()), ..Default::default() }),
    }
}

/// `primaryKey` may arrive as a string or a number; both are kept as text.
fn primary_key(value: Option<Value>, default: &str) -> String {
    match value {
        Some(Value::String(s)) if !s.is_empty() => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => default.to_string(),
    }
}

/// Build the notification shown for a push event received at `now`.
///
/// # Errors
///
/// Returns `InvalidPayload` when the payload is a JSON object whose fields
/// have the wrong types.
pub fn build_notification(
    payload: Option<&str>, config: &NotificationConfig, now: DateTime<Utc>,
) -> Result<Notification, Error> {
    let payload = decode(payload)?;

    Ok(Notification {
        title: payload.title.unwrap_or_else(|| config.app_name.clone()),
        body: payload.body.unwrap_or_default(),
        icon: config.icon.clone(),
        badge: config.badge.clone(),
        vibrate: config.vibrate.clone(),
        data: NotificationData {
            date_of_arrival: now.timestamp_millis(),
            primary_key: primary_key(payload.primary_key, &config.default_primary_key),
        },
    })
}
