//! Platform services that can run on dedicated compute

use serde::{Deserialize, Serialize};
use std::fmt;

/// A platform service with its own compute allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Service {
    /// PostgreSQL database
    Database,
    /// Hasura GraphQL API
    GraphqlApi,
    /// Auth service
    Auth,
    /// Storage service
    Storage,
}

impl Service {
    /// All services, in display order
    pub const ALL: [Service; 4] = [
        Service::Database,
        Service::GraphqlApi,
        Service::Auth,
        Service::Storage,
    ];

    /// Key used for the service in form field paths
    pub fn form_key(&self) -> &'static str {
        match self {
            Service::Database => "database",
            Service::GraphqlApi => "graphql_api",
            Service::Auth => "auth",
            Service::Storage => "storage",
        }
    }

    /// Key used for the service in the persisted configuration
    pub fn persisted_key(&self) -> &'static str {
        match self {
            Service::Database => "postgres",
            Service::GraphqlApi => "hasura",
            Service::Auth => "auth",
            Service::Storage => "storage",
        }
    }

    /// Human-readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            Service::Database => "PostgreSQL Database",
            Service::GraphqlApi => "Hasura GraphQL",
            Service::Auth => "Auth",
            Service::Storage => "Storage",
        }
    }

    /// Field path of one of the service's fields, e.g. `database.vcpu`
    pub fn field(&self, name: &str) -> String {
        format!("{}.{}", self.form_key(), name)
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.form_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys() {
        assert_eq!(Service::Database.persisted_key(), "postgres");
        assert_eq!(Service::GraphqlApi.persisted_key(), "hasura");
        assert_eq!(Service::GraphqlApi.field("replicas"), "graphql_api.replicas");
    }

    #[test]
    fn test_serde_name() {
        let json = serde_json::to_string(&Service::GraphqlApi).unwrap();
        assert_eq!(json, "\"graphql_api\"");
    }
}
