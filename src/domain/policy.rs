use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

const HOUR_MS: u64 = 60 * 60 * 1000;

pub const ADMIN_SESSION_TIMEOUT_MS: u64 = HOUR_MS;
pub const OPERATOR_SESSION_TIMEOUT_MS: u64 = 8 * HOUR_MS;
pub const USER_SESSION_TIMEOUT_MS: u64 = 24 * HOUR_MS;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

/// Canonical role vocabulary used by every policy lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Operator,
    User,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Operator => "operator",
            Role::User => "user",
        }
    }

    pub fn session_timeout_ms(self) -> u64 {
        match self {
            Role::Admin => ADMIN_SESSION_TIMEOUT_MS,
            Role::Operator => OPERATOR_SESSION_TIMEOUT_MS,
            Role::User => USER_SESSION_TIMEOUT_MS,
        }
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "admin" => Ok(Role::Admin),
            "operator" => Ok(Role::Operator),
            "user" => Ok(Role::User),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Role names used by the admin console's user management screens.
///
/// These never reach the policy tables directly; they are mapped onto
/// [`Role`] first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsoleRole {
    Admin,
    FieldWorker,
    Customer,
}

impl FromStr for ConsoleRole {
    type Err = UnknownRole;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "ADMIN" => Ok(ConsoleRole::Admin),
            "FIELD_WORKER" => Ok(ConsoleRole::FieldWorker),
            "CUSTOMER" => Ok(ConsoleRole::Customer),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

impl From<ConsoleRole> for Role {
    fn from(role: ConsoleRole) -> Self {
        match role {
            ConsoleRole::Admin => Role::Admin,
            ConsoleRole::FieldWorker => Role::Operator,
            ConsoleRole::Customer => Role::User,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteConfig {
    pub path: &'static str,
    pub title: &'static str,
    pub allowed_roles: &'static [Role],
    pub requires_2fa: bool,
}

const ROUTES: &[RouteConfig] = &[
    RouteConfig {
        path: "/dashboard",
        title: "Dashboard",
        allowed_roles: &[Role::Admin, Role::Operator],
        requires_2fa: false,
    },
    RouteConfig {
        path: "/users",
        title: "Users",
        allowed_roles: &[Role::Admin],
        requires_2fa: true,
    },
    RouteConfig {
        path: "/sessions",
        title: "Charging sessions",
        allowed_roles: &[Role::Admin, Role::Operator],
        requires_2fa: false,
    },
    RouteConfig {
        path: "/stations",
        title: "Stations",
        allowed_roles: &[Role::Admin, Role::Operator],
        requires_2fa: false,
    },
    RouteConfig {
        path: "/wallets",
        title: "Wallets",
        allowed_roles: &[Role::Admin],
        requires_2fa: true,
    },
    RouteConfig {
        path: "/insights",
        title: "AI insights",
        allowed_roles: &[Role::Admin],
        requires_2fa: false,
    },
    RouteConfig {
        path: "/profile",
        title: "Profile",
        allowed_roles: &[Role::Admin, Role::Operator, Role::User],
        requires_2fa: false,
    },
];

/// Session lifetime in milliseconds. Unrecognised roles get the `user` value.
pub fn calculate_session_timeout(role: &str) -> u64 {
    role.parse::<Role>()
        .map(Role::session_timeout_ms)
        .unwrap_or(USER_SESSION_TIMEOUT_MS)
}

pub fn should_require_2fa(role: &str) -> bool {
    role == Role::Admin.as_str()
}

pub fn get_route_config(route: &str) -> Option<&'static RouteConfig> {
    ROUTES.iter().find(|config| config.path == route)
}

pub fn has_route_access(role: &str, route: &str) -> bool {
    let Ok(role) = role.parse::<Role>() else {
        return false;
    };

    get_route_config(route).is_some_and(|config| config.allowed_roles.contains(&role))
}
