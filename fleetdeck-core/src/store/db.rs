//! The set of atoms backing the console.
//!
//! One `Db` is built per running application and shared by reference
//! between handlers and presentation consumers. Each field is one logical
//! resource; several views may watch the same atom.

use serde_json::{Map, Value};

use super::Atom;
use crate::model::Device;

/// A backend listing kept as raw JSON records.
pub type Listing = Vec<Value>;

/// An empty JSON object, the initial value of the `show_*` atoms.
pub fn empty_record() -> Value {
    Value::Object(Map::new())
}

/// Every atom the handlers write to.
#[derive(Debug)]
pub struct Db {
    // Devices
    pub devices: Atom<Vec<Device>>,
    pub searchable_devices: Atom<Vec<Device>>,
    /// Devices a package install would touch. Read by both the package page
    /// and the campaign-creation page.
    pub affected_devices: Atom<Listing>,
    /// Device uuids with a given package installed.
    pub devices_for_package: Atom<Vec<String>>,
    pub devices_queued_for_package: Atom<Listing>,
    pub package_queue_for_device: Atom<Listing>,
    pub package_history_for_device: Atom<Listing>,
    pub components_on_device: Atom<Listing>,
    pub firmware_on_device: Atom<Listing>,

    // Packages
    pub packages: Atom<Listing>,
    pub searchable_packages: Atom<Listing>,
    pub show_package: Atom<Value>,
    pub packages_for_device: Atom<Listing>,

    // Filters
    pub filters: Atom<Listing>,
    pub searchable_filters: Atom<Listing>,
    pub show_filter: Atom<Value>,
    pub filters_for_package: Atom<Listing>,
    pub packages_for_filter: Atom<Listing>,

    // Components
    pub searchable_components: Atom<Listing>,
    pub show_component: Atom<Value>,
    /// Device uuids that carry a given component.
    pub devices_for_component: Atom<Vec<String>>,

    // Updates
    pub updates: Atom<Listing>,
    pub show_update: Atom<Value>,
    pub update_status: Atom<Value>,

    /// Message of the most recent failure; empty when there is none.
    pub post_status: Atom<String>,
}

impl Db {
    pub fn new() -> Self {
        Self {
            devices: Atom::named("devices", Vec::new()),
            searchable_devices: Atom::named("searchable-devices", Vec::new()),
            affected_devices: Atom::named("affected-devices", Vec::new()),
            devices_for_package: Atom::named("devices-for-package", Vec::new()),
            devices_queued_for_package: Atom::named("devices-queued-for-package", Vec::new()),
            package_queue_for_device: Atom::named("package-queue-for-device", Vec::new()),
            package_history_for_device: Atom::named("package-history-for-device", Vec::new()),
            components_on_device: Atom::named("components-on-device", Vec::new()),
            firmware_on_device: Atom::named("firmware-on-device", Vec::new()),

            packages: Atom::named("packages", Vec::new()),
            searchable_packages: Atom::named("searchable-packages", Vec::new()),
            show_package: Atom::named("show-package", empty_record()),
            packages_for_device: Atom::named("packages-for-device", Vec::new()),

            filters: Atom::named("filters", Vec::new()),
            searchable_filters: Atom::named("searchable-filters", Vec::new()),
            show_filter: Atom::named("show-filter", empty_record()),
            filters_for_package: Atom::named("filters-for-package", Vec::new()),
            packages_for_filter: Atom::named("packages-for-filter", Vec::new()),

            searchable_components: Atom::named("searchable-components", Vec::new()),
            show_component: Atom::named("show-component", empty_record()),
            devices_for_component: Atom::named("devices-for-component", Vec::new()),

            updates: Atom::named("updates", Vec::new()),
            show_update: Atom::named("show-update", empty_record()),
            update_status: Atom::named("update-status", empty_record()),

            post_status: Atom::named("post-status", String::new()),
        }
    }

    /// Reset every atom to its empty value, as after a fresh login.
    ///
    /// Watchers of each atom are notified, so mounted views redraw empty.
    pub fn clear(&self) {
        self.devices.reset(Vec::new());
        self.searchable_devices.reset(Vec::new());
        self.affected_devices.reset(Vec::new());
        self.devices_for_package.reset(Vec::new());
        self.devices_queued_for_package.reset(Vec::new());
        self.package_queue_for_device.reset(Vec::new());
        self.package_history_for_device.reset(Vec::new());
        self.components_on_device.reset(Vec::new());
        self.firmware_on_device.reset(Vec::new());

        self.packages.reset(Vec::new());
        self.searchable_packages.reset(Vec::new());
        self.show_package.reset(empty_record());
        self.packages_for_device.reset(Vec::new());

        self.filters.reset(Vec::new());
        self.searchable_filters.reset(Vec::new());
        self.show_filter.reset(empty_record());
        self.filters_for_package.reset(Vec::new());
        self.packages_for_filter.reset(Vec::new());

        self.searchable_components.reset(Vec::new());
        self.show_component.reset(empty_record());
        self.devices_for_component.reset(Vec::new());

        self.updates.reset(Vec::new());
        self.show_update.reset(empty_record());
        self.update_status.reset(empty_record());

        self.post_status.reset(String::new());
    }

    /// The current failure message, if any.
    pub fn error_message(&self) -> Option<String> {
        let status = self.post_status.get();
        (!status.is_empty()).then(|| status.to_string())
    }
}

impl Default for Db {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Arc;

    #[test]
    fn starts_empty() {
        let db = Db::new();
        assert!(db.devices.get().is_empty());
        assert_eq!(*db.show_package.get(), json!({}));
        assert_eq!(db.error_message(), None);
    }

    #[test]
    fn clear_empties_and_notifies() {
        let db = Db::new();
        db.packages.reset(vec![json!({"name": "vim"})]);
        db.post_status.reset("boom".into());

        let fired = Arc::new(AtomicI32::new(0));
        let fired_clone = fired.clone();
        db.packages.add_watch("packages-table", move || {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        });

        db.clear();

        assert!(db.packages.get().is_empty());
        assert_eq!(db.error_message(), None);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
