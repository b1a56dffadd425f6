//! `shelfctl vendor ...`

use clap::Subcommand;
use serde_json::Value;

use super::{to_json, Context};
use crate::error::ApiError;

#[derive(Debug, Subcommand)]
pub enum VendorCommand {
    /// Register a vendor
    Add {
        name: String,
        /// Contact email; vendors act under this identity
        email: String,
    },

    /// List all vendors
    List,
}

pub async fn run(cmd: VendorCommand, ctx: &Context) -> Result<Value, ApiError> {
    match cmd {
        VendorCommand::Add { name, email } => {
            to_json(&ctx.engine.add_vendor(&name, &email, &ctx.actor).await?)
        }
        VendorCommand::List => to_json(&ctx.engine.db().vendors().list().await?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{as_vendor, context};
    use crate::error::ErrorCode;

    #[tokio::test]
    async fn test_add_and_list() {
        let ctx = context().await;
        let added = run(
            VendorCommand::Add {
                name: "Acme".into(),
                email: "orders@acme.test".into(),
            },
            &ctx,
        )
        .await
        .unwrap();
        assert_eq!(added["email"], "orders@acme.test");

        let listed = run(VendorCommand::List, &ctx).await.unwrap();
        assert_eq!(listed.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_vendor_role_cannot_register_vendors() {
        let ctx = as_vendor(context().await, "someone@acme.test");
        let err = run(
            VendorCommand::Add {
                name: "Other".into(),
                email: "other@acme.test".into(),
            },
            &ctx,
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);
    }
}
