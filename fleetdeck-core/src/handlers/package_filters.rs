//! Associations between packages and filters.

use super::{require, HandlerContext};
use crate::dispatch::{Action, Handler};
use crate::error::HandlerError;
use crate::transport::Method;

#[derive(Debug, Clone)]
pub struct PackageFiltersHandler {
    ctx: HandlerContext,
}

impl PackageFiltersHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }

    /// Both sides of the association change together; reload both.
    fn change_association(
        &self,
        kind: &'static str,
        method: Method,
        name: &str,
        version: &str,
        filter: &str,
    ) -> Result<(), HandlerError> {
        require(kind, "name", name)?;
        require(kind, "filter", filter)?;
        self.ctx.write_then(
            kind,
            method,
            self.ctx
                .url(&format!("/packages/{name}/{version}/filter/{filter}")),
            None,
            vec![
                Action::GetFiltersForPackage {
                    name: name.to_string(),
                    version: version.to_string(),
                },
                Action::GetPackagesForFilter {
                    filter: filter.to_string(),
                },
            ],
        )
    }
}

impl Handler for PackageFiltersHandler {
    fn handle(&self, action: &Action) -> Result<(), HandlerError> {
        let ctx = &self.ctx;
        let db = &ctx.db;
        let kind = action.kind();

        match action {
            Action::GetFiltersForPackage { name, version } => {
                require(kind, "name", name)?;
                let path = ctx.url(&format!("/packages/{name}/{version}/filter"));
                ctx.load_into(kind, path, &db.filters_for_package)
            }

            Action::GetPackagesForFilter { filter } => {
                require(kind, "filter", filter)?;
                let path = ctx.url(&format!("/filters/{filter}/package"));
                ctx.load_into(kind, path, &db.packages_for_filter)
            }

            Action::AddFilterToPackage {
                name,
                version,
                filter,
            } => self.change_association(kind, Method::Put, name, version, filter),

            Action::RemoveFilterFromPackage {
                name,
                version,
                filter,
            } => self.change_association(kind, Method::Delete, name, version, filter),

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
    async fn adding_reloads_both_sides() {
        let (store, transport) = testing::store();
        transport.respond(
            Method::Put,
            "/api/v1/packages/vim/8.0/filter/early-vins",
            Ok(json!(null)),
        );
        transport.respond(
            Method::Get,
            "/api/v1/packages/vim/8.0/filter",
            Ok(json!([{"name": "early-vins"}])),
        );
        transport.respond(
            Method::Get,
            "/api/v1/filters/early-vins/package",
            Ok(json!([{"name": "vim", "version": "8.0"}])),
        );

        store
            .dispatch(&Action::AddFilterToPackage {
                name: "vim".into(),
                version: "8.0".into(),
                filter: "early-vins".into(),
            })
            .unwrap();
        store.settle().await;

        let db = store.db();
        assert_eq!(db.filters_for_package.get().len(), 1);
        assert_eq!(db.packages_for_filter.get().len(), 1);
        assert_eq!(db.error_message(), None);
    }

    #[tokio::test]
    async fn removing_issues_delete() {
        let (store, transport) = testing::store();
        transport.respond(
            Method::Delete,
            "/api/v1/packages/vim/8.0/filter/early-vins",
            Ok(json!(null)),
        );
        transport.respond(Method::Get, "/api/v1/packages/vim/8.0/filter", Ok(json!([])));
        transport.respond(Method::Get, "/api/v1/filters/early-vins/package", Ok(json!([])));

        store
            .dispatch(&Action::RemoveFilterFromPackage {
                name: "vim".into(),
                version: "8.0".into(),
                filter: "early-vins".into(),
            })
            .unwrap();
        store.settle().await;

        assert!(transport.was_requested(
            Method::Delete,
            "/api/v1/packages/vim/8.0/filter/early-vins"
        ));
        assert_eq!(transport.requests().len(), 3);
    }
}
