//! Filter actions.

use serde_json::json;

use super::{regex_query, require, HandlerContext};
use crate::dispatch::{Action, Handler};
use crate::error::HandlerError;
use crate::model::NewFilter;
use crate::transport::Method;

#[derive(Debug, Clone)]
pub struct FiltersHandler {
    ctx: HandlerContext,
}

impl FiltersHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }

    /// Probe for the name, create, then refresh the search listing.
    fn create_filter(&self, kind: &'static str, filter: &NewFilter) -> Result<(), HandlerError> {
        require(kind, "name", &filter.name)?;
        require(kind, "expression", &filter.expression)?;

        let ctx = self.ctx.clone();
        let filter = filter.clone();
        self.ctx.run(kind, async move {
            ctx.probe_absent(&ctx.url(&format!("/filters/{}", filter.name)), "Filter")
                .await?;
            let body = json!({ "name": filter.name, "expression": filter.expression });
            ctx.send(Method::Post, &ctx.url("/filters"), Some(body))
                .await?;
            ctx.follow_up(&Action::SearchFiltersByRegex { regex: None })
        })
    }
}

impl Handler for FiltersHandler {
    fn handle(&self, action: &Action) -> Result<(), HandlerError> {
        let ctx = &self.ctx;
        let db = &ctx.db;
        let kind = action.kind();

        match action {
            Action::GetFilters => ctx.load_into(kind, ctx.url("/filters"), &db.filters),

            Action::SearchFiltersByRegex { regex } => {
                let path = ctx.url(&format!("/filters/search{}", regex_query(regex.as_deref())));
                ctx.load_into(kind, path, &db.searchable_filters)
            }

            Action::GetFilter { name } => {
                require(kind, "name", name)?;
                ctx.load_into(kind, ctx.url(&format!("/filters/{name}")), &db.show_filter)
            }

            Action::CreateFilter { filter } => self.create_filter(kind, filter),

            Action::EditFilter { filter } => {
                require(kind, "name", &filter.name)?;
                let body = json!({ "name": filter.name, "expression": filter.expression });
                ctx.write_then(
                    kind,
                    Method::Put,
                    ctx.url(&format!("/filters/{}", filter.name)),
                    Some(body),
                    vec![Action::GetFilter {
                        name: filter.name.clone(),
                    }],
                )
            }

            Action::DestroyFilter { name } => {
                require(kind, "name", name)?;
                ctx.write_then(
                    kind,
                    Method::Delete,
                    ctx.url(&format!("/filters/{name}")),
                    None,
                    vec![Action::SearchFiltersByRegex { regex: None }],
                )
            }

            _ => Ok(()),
        }
    }
}
