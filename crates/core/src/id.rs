// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Entity identifiers.
//!
//! Every stored entity is keyed by a random v4 UUID. Entities only ever hold
//! the ids of their owners (down-pointers), never references to each other.

/// Define a newtype ID wrapper around [`uuid::Uuid`].
///
/// Generates `new()` for random ID generation, `parse()` for user input,
/// `as_uuid()`, `short()`, `Display`, `FromStr` and `From<Uuid>`.
/// Serializes transparently as the hyphenated UUID string.
///
/// ```ignore
/// define_id! {
///     /// Doc comment for the ID type.
///     pub struct JobId;
/// }
/// ```
#[macro_export]
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident;
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
            serde::Serialize, serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub uuid::Uuid);

        impl $name {
            /// Generate a new random ID
            pub fn new() -> Self {
                Self(uuid::Uuid::new_v4())
            }

            /// Parse an ID from its hyphenated or simple string form
            pub fn parse(s: &str) -> Result<Self, uuid::Error> {
                uuid::Uuid::parse_str(s.trim()).map(Self)
            }

            pub fn as_uuid(&self) -> &uuid::Uuid {
                &self.0
            }

            /// First `n` hex characters, for log lines and tables.
            pub fn short(&self, n: usize) -> String {
                let simple = self.0.simple().to_string();
                simple[..n.min(simple.len())].to_string()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl From<uuid::Uuid> for $name {
            fn from(id: uuid::Uuid) -> Self {
                Self(id)
            }
        }
    };
}

define_id! {
    /// Identifier of a tenant project.
    pub struct ProjectId;
}

define_id! {
    /// Identifier of a namespace inside a project.
    pub struct NamespaceId;
}

define_id! {
    /// Identifier of a job specification.
    pub struct JobId;
}

define_id! {
    pub struct ResourceId;
}

define_id! {
    pub struct SecretId;
}

define_id! {
    /// Identifier of a queued deployment.
    pub struct DeploymentId;
}

define_id! {
    /// Identifier of one attempt of one scheduled job execution.
    pub struct JobRunId;
}

define_id! {
    pub struct OperatorRunId;
}

define_id! {
    /// Identifier of a replay request.
    pub struct ReplayId;
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
