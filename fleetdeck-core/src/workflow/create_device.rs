//! Device creation.
//!
//! A device lives in two services: the core service owns its record, the
//! resolver needs to know it exists before packages can be resolved
//! against it. Creating one is four causally ordered steps:
//!
//! 1. `Probe`: GET the device; if it is already there, stop with a conflict.
//! 2. `RegisterCore`: POST the new record, with a client-generated uuid.
//! 3. `RegisterResolver`: PUT the device id to the resolver.
//! 4. `Refresh`: dispatch `search-devices-by-regex` so every listing redraws.
//!
//! The probe can race another client. A write that loses the race fails
//! with the server's conflict and is reported like any other failure; the
//! workflow does not retry. If `RegisterResolver` fails, the core record
//! stays.

use serde_json::json;

use super::{Progress, WorkflowFailure, WorkflowStep};
use crate::dispatch::Action;
use crate::handlers::HandlerContext;
use crate::model::{Device, NewDevice};
use crate::transport::Method;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateDeviceStep {
    Probe,
    RegisterCore,
    RegisterResolver,
    Refresh,
}

impl WorkflowStep for CreateDeviceStep {
    fn is_write(&self) -> bool {
        matches!(self, Self::RegisterCore | Self::RegisterResolver)
    }
}

/// One run of the device-creation workflow.
#[derive(Debug)]
pub struct CreateDevice {
    ctx: HandlerContext,
    device: NewDevice,
}

impl CreateDevice {
    pub fn new(ctx: HandlerContext, device: NewDevice) -> Self {
        Self { ctx, device }
    }

    /// Run every step in order. Returns the registered device.
    pub async fn run(self) -> Result<Device, WorkflowFailure<CreateDeviceStep>> {
        let Self { ctx, device } = self;
        let mut progress = Progress::new();
        let device_path = ctx.url(&format!("/devices/{}", device.device_id));

        progress
            .step(
                CreateDeviceStep::Probe,
                ctx.probe_absent(&device_path, "Device"),
            )
            .await?;

        let record = Device {
            uuid: ctx.ids.next_id(),
            device_id: device.device_id.clone(),
            device_type: Some(ctx.config.default_device_type.clone()),
            extra: Default::default(),
        };
        let body = json!({
            "uuid": record.uuid,
            "deviceId": record.device_id,
            "deviceType": record.device_type,
        });

        progress
            .step(
                CreateDeviceStep::RegisterCore,
                ctx.send(Method::Post, &ctx.url("/devices/create"), Some(body)),
            )
            .await?;

        progress
            .step(
                CreateDeviceStep::RegisterResolver,
                ctx.send(Method::Put, &device_path, None),
            )
            .await?;

        progress
            .step(CreateDeviceStep::Refresh, async {
                ctx.follow_up(&Action::SearchDevicesByRegex { regex: None })
            })
            .await?;

        tracing::info!(uuid = %record.uuid, device_id = %record.device_id, "device created");
        Ok(record)
    }
}
