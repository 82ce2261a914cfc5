//! Component catalogue actions.

use serde_json::json;

use super::{device_uuids, regex_query, require, HandlerContext};
use crate::dispatch::{Action, Handler};
use crate::error::HandlerError;
use crate::model::{DeviceRef, NewComponent};
use crate::transport::Method;

#[derive(Debug, Clone)]
pub struct ComponentsHandler {
    ctx: HandlerContext,
}

impl ComponentsHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }

    fn create_component(
        &self,
        kind: &'static str,
        component: &NewComponent,
    ) -> Result<(), HandlerError> {
        require(kind, "partNumber", &component.part_number)?;

        let ctx = self.ctx.clone();
        let component = component.clone();
        self.ctx.run(kind, async move {
            let path = ctx.url(&format!("/components/{}", component.part_number));
            ctx.probe_absent(&path, "Component").await?;
            let body = json!({
                "partNumber": component.part_number,
                "description": component.description,
            });
            ctx.send(Method::Put, &path, Some(body)).await?;
            ctx.follow_up(&Action::SearchComponentsByRegex { regex: None })
        })
    }
}

impl Handler for ComponentsHandler {
    fn handle(&self, action: &Action) -> Result<(), HandlerError> {
        let ctx = &self.ctx;
        let db = &ctx.db;
        let kind = action.kind();

        match action {
            Action::SearchComponentsByRegex { regex } => {
                let path = ctx.url(&format!(
                    "/components/search{}",
                    regex_query(regex.as_deref())
                ));
                ctx.load_into(kind, path, &db.searchable_components)
            }

            Action::GetComponent { part_number } => {
                require(kind, "partNumber", part_number)?;
                let path = ctx.url(&format!("/components/{part_number}"));
                ctx.load_into(kind, path, &db.show_component)
            }

            Action::CreateComponent { component } => self.create_component(kind, component),

            Action::DestroyComponent { part_number } => {
                require(kind, "partNumber", part_number)?;
                ctx.write_then(
                    kind,
                    Method::Delete,
                    ctx.url(&format!("/components/{part_number}")),
                    None,
                    vec![Action::SearchComponentsByRegex { regex: None }],
                )
            }

            Action::GetDevicesForComponent { part_number } => {
                require(kind, "partNumber", part_number)?;
                let path = ctx.url(&format!("/devices?component={part_number}"));
                ctx.load_projected(
                    kind,
                    path,
                    &db.devices_for_component,
                    |devices: Vec<DeviceRef>| device_uuids(devices),
                )
            }

            _ => Ok(()),
        }
    }
}
