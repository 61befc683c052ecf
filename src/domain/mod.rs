//! Domain types for the requisition workflow with strong typing.
//!
//! Identifiers are newtypes so a `UserId` can never be passed where a
//! `RequisitionId` is expected. Roles and priorities are closed enums; the
//! strings stored in the database are only ever produced and parsed here.

pub mod access;
pub mod status;

pub use access::{RequisitionAccess, requisition_access};
pub use status::{RequisitionStatus, allowed_transitions};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

macro_rules! id_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        #[derive(Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i32);

        impl $name {
            #[must_use]
            pub const fn new(id: i32) -> Self {
                Self(id)
            }

            #[must_use]
            pub const fn value(&self) -> i32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$name> for i32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl From<i32> for $name {
            fn from(id: i32) -> Self {
                Self::new(id)
            }
        }
    };
}

id_newtype!(
    /// Primary key of a requisition row.
    ///
    /// ```rust
    /// use rqflow::domain::RequisitionId;
    ///
    /// let id = RequisitionId::new(42);
    /// assert_eq!(id.value(), 42);
    /// assert_eq!(id.to_string(), "42");
    /// ```
    RequisitionId
);

id_newtype!(
    /// Primary key of a user row.
    UserId
);

/// Returned when a stored string does not name a known variant.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {kind}: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Roles known to the workflow.
///
/// The `roles` table holds the same names as reference data; permission
/// decisions are always taken on this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "Solicitante")]
    Requester,
    #[serde(rename = "Almacen")]
    Warehouse,
    #[serde(rename = "Compras")]
    Purchasing,
    Admin,
    Superadmin,
}

impl Role {
    pub const ALL: [Self; 5] = [
        Self::Requester,
        Self::Warehouse,
        Self::Purchasing,
        Self::Admin,
        Self::Superadmin,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Requester => "Solicitante",
            Self::Warehouse => "Almacen",
            Self::Purchasing => "Compras",
            Self::Admin => "Admin",
            Self::Superadmin => "Superadmin",
        }
    }

    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Requester => "Crea requisiciones y consulta su estado",
            Self::Warehouse => "Revisa existencias y recibe mercancia",
            Self::Purchasing => "Cotiza, aprueba y compra",
            Self::Admin => "Administra usuarios y puede fijar cualquier estado",
            Self::Superadmin => "Acceso total, incluida la gestion de administradores",
        }
    }

    /// Admin and Superadmin bypass every workflow restriction.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin | Self::Superadmin)
    }

    /// Roles that can see every requisition, not only their own.
    #[must_use]
    pub const fn sees_all_requisitions(self) -> bool {
        !matches!(self, Self::Requester)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseEnumError::new("role", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Priority {
    #[serde(rename = "Alta")]
    High,
    #[default]
    #[serde(rename = "Media")]
    Medium,
    #[serde(rename = "Baja")]
    Low,
}

impl Priority {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::High => "Alta",
            Self::Medium => "Media",
            Self::Low => "Baja",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "alta" | "high" => Ok(Self::High),
            "media" | "medium" => Ok(Self::Medium),
            "baja" | "low" => Ok(Self::Low),
            _ => Err(ParseEnumError::new("priority", s)),
        }
    }
}

/// Whoever is performing an operation.
///
/// `user_id` is `None` for the environment admin, which has no row in `users`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: Option<UserId>,
    pub username: String,
    pub role: Role,
}

impl Actor {
    #[must_use]
    pub fn new(user_id: Option<UserId>, username: impl Into<String>, role: Role) -> Self {
        Self {
            user_id,
            username: username.into(),
            role,
        }
    }

    #[must_use]
    pub fn is_user(&self, id: UserId) -> bool {
        self.user_id == Some(id)
    }
}

/// Title-cases a product name the way the catalog stores it.
///
/// Whitespace runs collapse to a single space.
#[must_use]
pub fn title_case(input: &str) -> String {
    input
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}
