//! Authorization decisions
//!
//! A single closed decision table mapping {role, resource} to allow/deny,
//! replacing scattered per-handler role checks. Route guards call
//! `can_access`; nothing else in the codebase inspects roles directly.

use crate::models::Role;

/// Administration areas gated by role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// User administration screens
    Users,
    /// Product administration screens
    Products,
    /// Account settings screens
    Settings,
    /// Post-login landing page
    Dashboard,
}

/// Decide whether `role` may access `resource`.
///
/// Admins reach everything; distributors manage products; clients manage
/// their own settings; unassigned accounts only see the dashboard.
pub fn can_access(role: Role, resource: Resource) -> bool {
    match (role, resource) {
        (Role::Admin, _) => true,
        (_, Resource::Dashboard) => true,
        (Role::Distribuidor, Resource::Products) => true,
        (Role::Cliente, Resource::Settings) => true,
        _ => false,
    }
}

/// Post-login landing route for a role
pub fn landing_route(role: Role) -> &'static str {
    match role {
        Role::Admin => "/users",
        Role::Distribuidor => "/products",
        Role::Cliente => "/settings",
        Role::Default => "/dashboard",
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn role_strategy() -> impl Strategy<Value = Role> {
        prop_oneof![
            Just(Role::Admin),
            Just(Role::Distribuidor),
            Just(Role::Cliente),
            Just(Role::Default),
        ]
    }

    fn resource_strategy() -> impl Strategy<Value = Resource> {
        prop_oneof![
            Just(Resource::Users),
            Just(Resource::Products),
            Just(Resource::Settings),
            Just(Resource::Dashboard),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(20))]

        #[test]
        fn property_non_admin_never_reaches_users(role in role_strategy()) {
            if role != Role::Admin {
                prop_assert!(!can_access(role, Resource::Users));
            }
        }

        #[test]
        fn property_dashboard_is_universal(role in role_strategy()) {
            prop_assert!(can_access(role, Resource::Dashboard));
        }

        #[test]
        fn property_admin_is_superset(resource in resource_strategy(), role in role_strategy()) {
            // Anything any role can do, admin can do too
            if can_access(role, resource) {
                prop_assert!(can_access(Role::Admin, resource));
            }
        }
    }
}
