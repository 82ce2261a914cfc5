//! Backend records the store needs to look inside.
//!
//! Most listings are kept as raw JSON because only the presentation layer
//! reads them. Devices are typed because the store builds, probes and
//! projects them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A device as returned by the device listing and search endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub uuid: String,
    pub device_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,
    /// Fields this crate does not interpret.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Device {
    pub fn new(uuid: impl Into<String>, device_id: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            device_id: device_id.into(),
            device_type: None,
            extra: Map::new(),
        }
    }
}

/// Just enough of a device record to project it down to its identifier.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceRef {
    pub uuid: String,
}

/// Form payload for `create-device`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDevice {
    pub device_id: String,
}

/// Form payload for `create-filter` and `edit-filter`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFilter {
    pub name: String,
    pub expression: String,
}

/// Form payload for `create-component`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComponent {
    pub part_number: String,
    #[serde(default)]
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn device_keeps_unknown_fields() {
        let device: Device = serde_json::from_value(json!({
            "uuid": "u1",
            "deviceId": "D1",
            "lastSeen": "yesterday"
        }))
        .unwrap();

        assert_eq!(device.uuid, "u1");
        assert_eq!(device.device_id, "D1");
        assert_eq!(device.device_type, None);
        assert_eq!(device.extra.get("lastSeen"), Some(&json!("yesterday")));
    }

    #[test]
    fn device_without_id_is_rejected() {
        let result: Result<Device, _> = serde_json::from_value(json!({"uuid": "u1"}));
        assert!(result.is_err());
    }

    #[test]
    fn component_description_is_optional() {
        let component: NewComponent =
            serde_json::from_value(json!({"partNumber": "P-1"})).unwrap();
        assert_eq!(component.part_number, "P-1");
        assert!(component.description.is_empty());
    }
}
