//! OptiTalent GraphQL API.
//!
//! Every resolver reads the tenant from the authenticated [`auth::CurrentUser`]
//! and scopes its queries to it.

/// Declares a GraphQL enum mirroring a sea-orm active enum, with conversions
/// both ways.
macro_rules! graphql_enum {
    ($(#[$meta:meta])* $name:ident => $module:ident :: $model:ident { $($variant:ident),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(async_graphql::Enum, Copy, Clone, Debug, Eq, PartialEq)]
        pub enum $name {
            $($variant),+
        }

        impl From<$module::$model> for $name {
            fn from(value: $module::$model) -> Self {
                match value {
                    $($module::$model::$variant => $name::$variant),+
                }
            }
        }

        impl From<$name> for $module::$model {
            fn from(value: $name) -> Self {
                match value {
                    $($name::$variant => $module::$model::$variant),+
                }
            }
        }
    };
}

pub mod assessments;
pub mod assistant;
pub mod attendance;
pub mod auth;
pub mod directory;
pub mod helpdesk;
pub mod learning;
pub mod leave;
pub mod notifications;
pub mod payroll;
pub mod recruitment;
pub mod schema;
pub mod seed;
pub mod tenants;
pub mod users;

pub use schema::{AppSchema, MutationRoot, QueryRoot, TenantTag, build_schema};
