//! Firmware actions.

use super::{require, HandlerContext};
use crate::dispatch::{Action, Handler};
use crate::error::HandlerError;

#[derive(Debug, Clone)]
pub struct FirmwareHandler {
    ctx: HandlerContext,
}

impl FirmwareHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }
}

impl Handler for FirmwareHandler {
    fn handle(&self, action: &Action) -> Result<(), HandlerError> {
        match action {
            Action::ListFirmwareOnDevice { device } => {
                require(action.kind(), "device", device)?;
                let path = self.ctx.url(&format!("/firmware/{device}"));
                self.ctx
                    .load_into(action.kind(), path, &self.ctx.db.firmware_on_device)
            }
            _ => Ok(()),
        }
    }
}
