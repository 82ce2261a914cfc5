//! Device actions.

use super::{device_uuids, regex_query, require, HandlerContext};
use crate::dispatch::{Action, Handler};
use crate::error::HandlerError;
use crate::model::{DeviceRef, NewDevice};
use crate::transport::Method;
use crate::workflow::CreateDevice;

/// Listing, search, creation and per-device views.
#[derive(Debug, Clone)]
pub struct DevicesHandler {
    ctx: HandlerContext,
}

impl DevicesHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }

    fn create_device(&self, action: &Action, device: &NewDevice) -> Result<(), HandlerError> {
        require(action.kind(), "deviceId", &device.device_id)?;

        let workflow = CreateDevice::new(self.ctx.clone(), device.clone());
        let funnel = self.ctx.funnel.clone();
        self.ctx.in_flight.spawn(action.kind(), async move {
            if let Err(failure) = workflow.run().await {
                if failure.is_partial() {
                    tracing::warn!(
                        failed_at = ?failure.failed_at,
                        completed = ?failure.completed,
                        "device creation stopped after a partial write; not rolled back"
                    );
                }
                funnel.report(&failure.error);
            }
        })
    }
}

impl Handler for DevicesHandler {
    fn handle(&self, action: &Action) -> Result<(), HandlerError> {
        let ctx = &self.ctx;
        let db = &ctx.db;
        let kind = action.kind();

        match action {
            Action::GetDevices => ctx.load_into(kind, ctx.url("/devices"), &db.devices),

            Action::SearchDevicesByRegex { regex } => {
                let path = ctx.url(&format!("/devices/search{}", regex_query(regex.as_deref())));
                ctx.load_into(kind, path, &db.searchable_devices)
            }

            Action::CreateDevice { device } => self.create_device(action, device),

            Action::FetchAffectedDevices { name, version } => {
                require(kind, "name", name)?;
                let path = ctx.url(&format!("/resolve/{name}/{version}"));
                ctx.load_into(kind, path, &db.affected_devices)
            }

            Action::GetDevicesForPackage { name, version } => {
                require(kind, "name", name)?;
                let path = ctx.url(&format!(
                    "/devices?packageName={name}&packageVersion={version}"
                ));
                ctx.load_projected(kind, path, &db.devices_for_package, |devices: Vec<DeviceRef>| {
                    device_uuids(devices)
                })
            }

            Action::GetPackageQueueForDevice { device } => {
                require(kind, "device", device)?;
                let path = ctx.url(&format!("/devices/{device}/queued"));
                ctx.load_into(kind, path, &db.package_queue_for_device)
            }

            Action::GetPackageHistoryForDevice { device } => {
                require(kind, "device", device)?;
                let path = ctx.url(&format!("/devices/{device}/history"));
                ctx.load_into(kind, path, &db.package_history_for_device)
            }

            Action::ListComponentsOnDevice { device } => {
                require(kind, "device", device)?;
                let path = ctx.url(&format!("/devices/{device}/component"));
                ctx.load_into(kind, path, &db.components_on_device)
            }

            // Re-list from the server rather than patching the local list.
            Action::AddComponentToDevice {
                device,
                part_number,
            } => {
                require(kind, "device", device)?;
                require(kind, "partNumber", part_number)?;
                ctx.write_then(
                    kind,
                    Method::Put,
                    ctx.url(&format!("/devices/{device}/component/{part_number}")),
                    None,
                    vec![Action::ListComponentsOnDevice {
                        device: device.clone(),
                    }],
                )
            }

            Action::SyncPackagesForDevice { device } => {
                require(kind, "device", device)?;
                ctx.write_then(
                    kind,
                    Method::Put,
                    ctx.url(&format!("/devices/{device}/sync")),
                    None,
                    Vec::new(),
                )
            }

            _ => Ok(()),
        }
    }
}
