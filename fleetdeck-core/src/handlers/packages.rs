//! Package actions.

use super::{regex_query, require, HandlerContext};
use crate::dispatch::{Action, Handler};
use crate::error::HandlerError;
use crate::transport::Method;

/// Package listing, detail pages and install campaigns.
#[derive(Debug, Clone)]
pub struct PackagesHandler {
    ctx: HandlerContext,
}

impl PackagesHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }
}

impl Handler for PackagesHandler {
    fn handle(&self, action: &Action) -> Result<(), HandlerError> {
        let ctx = &self.ctx;
        let db = &ctx.db;
        let kind = action.kind();

        match action {
            Action::GetPackages => ctx.load_into(kind, ctx.url("/packages"), &db.packages),

            Action::SearchPackagesByRegex { regex } => {
                let path = ctx.url(&format!("/packages/search{}", regex_query(regex.as_deref())));
                ctx.load_into(kind, path, &db.searchable_packages)
            }

            Action::GetPackage { name, version } => {
                require(kind, "name", name)?;
                let path = ctx.url(&format!("/packages/{name}/{version}"));
                ctx.load_into(kind, path, &db.show_package)
            }

            Action::GetPackagesForDevice { device } => {
                require(kind, "device", device)?;
                let path = ctx.url(&format!("/devices/{device}/package"));
                ctx.load_into(kind, path, &db.packages_for_device)
            }

            Action::GetDevicesQueuedForPackage { name, version } => {
                require(kind, "name", name)?;
                let path = ctx.url(&format!("/packages/{name}/{version}/queued"));
                ctx.load_into(kind, path, &db.devices_queued_for_package)
            }

            Action::UpdatePackage { package } => ctx.write_then(
                kind,
                Method::Post,
                ctx.url("/install_campaigns"),
                Some(package.clone()),
                Vec::new(),
            ),

            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing;
    use crate::dispatch::Action;
    use crate::transport::{HttpError, Method};
    use serde_json::json;

    #[tokio::test]
    async fn package_detail_lands_in_show_package() {
        let (store, transport) = testing::store();
        transport.respond(
            Method::Get,
            "/api/v1/packages/vim/8.0",
            Ok(json!({"id": {"name": "vim", "version": "8.0"}, "description": "editor"})),
        );

        store
            .dispatch(&Action::GetPackage {
                name: "vim".into(),
                version: "8.0".into(),
            })
            .unwrap();
        store.settle().await;

        assert_eq!(store.db().show_package.get()["description"], json!("editor"));
    }

    #[tokio::test]
    async fn search_and_listing_use_separate_atoms() {
        let (store, transport) = testing::store();
        transport.respond(Method::Get, "/api/v1/packages", Ok(json!([{"n": 1}, {"n": 2}])));
        transport.respond(
            Method::Get,
            "/api/v1/packages/search?regex=^v",
            Ok(json!([{"n": 1}])),
        );

        store.dispatch(&Action::GetPackages).unwrap();
        store
            .dispatch(&Action::SearchPackagesByRegex {
                regex: Some("^v".into()),
            })
            .unwrap();
        store.settle().await;

        assert_eq!(store.db().packages.get().len(), 2);
        assert_eq!(store.db().searchable_packages.get().len(), 1);
    }

    #[tokio::test]
    async fn install_campaign_posts_payload() {
        let (store, transport) = testing::store();
        let campaign = json!({"packageId": {"name": "vim", "version": "8.0"}, "priority": 1});
        transport.respond(
            Method::Post,
            "/api/v1/install_campaigns",
            Err(HttpError::with_message(400, "priority out of range")),
        );

        store
            .dispatch(&Action::UpdatePackage {
                package: campaign.clone(),
            })
            .unwrap();
        store.settle().await;

        let request = &transport.requests()[0];
        assert_eq!(request.body, Some(campaign));
        assert_eq!(
            store.db().error_message().as_deref(),
            Some("priority out of range")
        );
    }
}
