//! Action vocabulary.
//!
//! Every user intent the console understands is one variant of [`Action`].
//! The serialized form is the wire contract with the views:
//! `{"kind": "<kebab-case name>", ...payload fields}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{NewComponent, NewDevice, NewFilter};

/// An immutable request for the console to perform a domain operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Action {
    // Devices
    GetDevices,
    SearchDevicesByRegex {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        regex: Option<String>,
    },
    CreateDevice {
        device: NewDevice,
    },
    FetchAffectedDevices {
        name: String,
        version: String,
    },
    GetDevicesForPackage {
        name: String,
        version: String,
    },
    GetPackageQueueForDevice {
        device: String,
    },
    GetPackageHistoryForDevice {
        device: String,
    },
    ListComponentsOnDevice {
        device: String,
    },
    AddComponentToDevice {
        device: String,
        #[serde(rename = "partNumber")]
        part_number: String,
    },
    SyncPackagesForDevice {
        device: String,
    },

    // Firmware
    ListFirmwareOnDevice {
        device: String,
    },

    // Packages
    GetPackages,
    SearchPackagesByRegex {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        regex: Option<String>,
    },
    GetPackage {
        name: String,
        version: String,
    },
    GetPackagesForDevice {
        device: String,
    },
    GetDevicesQueuedForPackage {
        name: String,
        version: String,
    },
    UpdatePackage {
        package: Value,
    },

    // Filters
    GetFilters,
    SearchFiltersByRegex {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        regex: Option<String>,
    },
    GetFilter {
        name: String,
    },
    CreateFilter {
        filter: NewFilter,
    },
    EditFilter {
        filter: NewFilter,
    },
    DestroyFilter {
        name: String,
    },

    // Package filters
    GetFiltersForPackage {
        name: String,
        version: String,
    },
    GetPackagesForFilter {
        filter: String,
    },
    AddFilterToPackage {
        name: String,
        version: String,
        filter: String,
    },
    RemoveFilterFromPackage {
        name: String,
        version: String,
        filter: String,
    },

    // Components
    SearchComponentsByRegex {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        regex: Option<String>,
    },
    GetComponent {
        #[serde(rename = "partNumber")]
        part_number: String,
    },
    CreateComponent {
        component: NewComponent,
    },
    DestroyComponent {
        #[serde(rename = "partNumber")]
        part_number: String,
    },
    GetDevicesForComponent {
        #[serde(rename = "partNumber")]
        part_number: String,
    },

    // Updates
    GetUpdates,
    GetUpdate {
        id: String,
    },
    CreateUpdate {
        update: Value,
    },
    GetUpdateStatus {
        id: String,
    },
    FailAllUpdatesByVin {
        vin: String,
    },
}

impl Action {
    /// The wire discriminant of this action.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::GetDevices => "get-devices",
            Self::SearchDevicesByRegex { .. } => "search-devices-by-regex",
            Self::CreateDevice { .. } => "create-device",
            Self::FetchAffectedDevices { .. } => "fetch-affected-devices",
            Self::GetDevicesForPackage { .. } => "get-devices-for-package",
            Self::GetPackageQueueForDevice { .. } => "get-package-queue-for-device",
            Self::GetPackageHistoryForDevice { .. } => "get-package-history-for-device",
            Self::ListComponentsOnDevice { .. } => "list-components-on-device",
            Self::AddComponentToDevice { .. } => "add-component-to-device",
            Self::SyncPackagesForDevice { .. } => "sync-packages-for-device",
            Self::ListFirmwareOnDevice { .. } => "list-firmware-on-device",
            Self::GetPackages => "get-packages",
            Self::SearchPackagesByRegex { .. } => "search-packages-by-regex",
            Self::GetPackage { .. } => "get-package",
            Self::GetPackagesForDevice { .. } => "get-packages-for-device",
            Self::GetDevicesQueuedForPackage { .. } => "get-devices-queued-for-package",
            Self::UpdatePackage { .. } => "update-package",
            Self::GetFilters => "get-filters",
            Self::SearchFiltersByRegex { .. } => "search-filters-by-regex",
            Self::GetFilter { .. } => "get-filter",
            Self::CreateFilter { .. } => "create-filter",
            Self::EditFilter { .. } => "edit-filter",
            Self::DestroyFilter { .. } => "destroy-filter",
            Self::GetFiltersForPackage { .. } => "get-filters-for-package",
            Self::GetPackagesForFilter { .. } => "get-packages-for-filter",
            Self::AddFilterToPackage { .. } => "add-filter-to-package",
            Self::RemoveFilterFromPackage { .. } => "remove-filter-from-package",
            Self::SearchComponentsByRegex { .. } => "search-components-by-regex",
            Self::GetComponent { .. } => "get-component",
            Self::CreateComponent { .. } => "create-component",
            Self::DestroyComponent { .. } => "destroy-component",
            Self::GetDevicesForComponent { .. } => "get-devices-for-component",
            Self::GetUpdates => "get-updates",
            Self::GetUpdate { .. } => "get-update",
            Self::CreateUpdate { .. } => "create-update",
            Self::GetUpdateStatus { .. } => "get-update-status",
            Self::FailAllUpdatesByVin { .. } => "fail-all-updates-by-vin",
        }
    }

    /// Parse an action from its JSON wire form.
    pub fn from_json(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}
