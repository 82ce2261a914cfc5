//! Update campaign actions.

use super::{require, HandlerContext};
use crate::dispatch::{Action, Handler};
use crate::error::HandlerError;
use crate::transport::Method;

#[derive(Debug, Clone)]
pub struct UpdatesHandler {
    ctx: HandlerContext,
}

impl UpdatesHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }
}

impl Handler for UpdatesHandler {
    fn handle(&self, action: &Action) -> Result<(), HandlerError> {
        let ctx = &self.ctx;
        let db = &ctx.db;
        let kind = action.kind();

        match action {
            Action::GetUpdates => ctx.load_into(kind, ctx.url("/update_requests"), &db.updates),

            Action::GetUpdate { id } => {
                require(kind, "id", id)?;
                let path = ctx.url(&format!("/update_requests/{id}"));
                ctx.load_into(kind, path, &db.show_update)
            }

            Action::CreateUpdate { update } => ctx.write_then(
                kind,
                Method::Post,
                ctx.url("/updates"),
                Some(update.clone()),
                vec![Action::GetUpdates],
            ),

            Action::GetUpdateStatus { id } => {
                require(kind, "id", id)?;
                let path = ctx.url(&format!("/update_requests/{id}/status"));
                ctx.load_into(kind, path, &db.update_status)
            }

            // The vin doubles as the device id in the queue listing.
            Action::FailAllUpdatesByVin { vin } => {
                require(kind, "vin", vin)?;
                ctx.write_then(
                    kind,
                    Method::Put,
                    ctx.url(&format!("/vehicle_updates/{vin}/fail")),
                    None,
                    vec![Action::GetPackageQueueForDevice {
                        device: vin.clone(),
                    }],
                )
            }

            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing;
    use crate::dispatch::Action;
    use crate::transport::Method;
    use serde_json::json;

    #[tokio::test]
    async fn create_update_reloads_list() {
        let (store, transport) = testing::store();
        let update = json!({"packageId": {"name": "vim", "version": "8.0"}, "priority": 10});
        transport.respond(Method::Post, "/api/v1/updates", Ok(json!(null)));
        transport.respond(Method::Get, "/api/v1/update_requests", Ok(json!([update.clone()])));

        store
            .dispatch(&Action::CreateUpdate {
                update: update.clone(),
            })
            .unwrap();
        store.settle().await;

        assert_eq!(*store.db().updates.get(), vec![update]);
    }

    #[tokio::test]
    async fn status_lands_in_its_own_atom() {
        let (store, transport) = testing::store();
        transport.respond(
            Method::Get,
            "/api/v1/update_requests/r1/status",
            Ok(json!([["VIN1", "Pending"]])),
        );

        store
            .dispatch(&Action::GetUpdateStatus { id: "r1".into() })
            .unwrap();
        store.settle().await;

        assert_eq!(*store.db().update_status.get(), json!([["VIN1", "Pending"]]));
        assert_eq!(*store.db().show_update.get(), json!({}));
    }

    #[tokio::test]
    async fn failing_by_vin_reloads_the_queue() {
        let (store, transport) = testing::store();
        transport.respond(Method::Put, "/api/v1/vehicle_updates/VIN1/fail", Ok(json!(null)));
        transport.respond(Method::Get, "/api/v1/devices/VIN1/queued", Ok(json!([])));

        store
            .dispatch(&Action::FailAllUpdatesByVin { vin: "VIN1".into() })
            .unwrap();
        store.settle().await;

        assert!(transport.was_requested(Method::Get, "/api/v1/devices/VIN1/queued"));
    }
}
