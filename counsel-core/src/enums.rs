//! Enum types for Counselbase entities

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// ACADEMIC ENUMS
// ============================================================================

/// Branch codes recognized by the assignment workflow.
///
/// Slots and students carry a branch; a student only sees counsellor slots
/// whose branch matches their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "UPPERCASE")]
pub enum Branch {
    Cse,
    Ece,
    Eee,
    Mech,
    Civil,
    It,
}

impl FromStr for Branch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "CSE" => Ok(Branch::Cse),
            "ECE" => Ok(Branch::Ece),
            "EEE" => Ok(Branch::Eee),
            "MECH" => Ok(Branch::Mech),
            "CIVIL" => Ok(Branch::Civil),
            "IT" => Ok(Branch::It),
            other => Err(format!("unknown branch code: {}", other)),
        }
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            Branch::Cse => "CSE",
            Branch::Ece => "ECE",
            Branch::Eee => "EEE",
            Branch::Mech => "MECH",
            Branch::Civil => "CIVIL",
            Branch::It => "IT",
        };
        write!(f, "{}", code)
    }
}

/// Class section (A through D).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "UPPERCASE")]
pub enum Section {
    A,
    B,
    C,
    D,
}

impl FromStr for Section {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "A" => Ok(Section::A),
            "B" => Ok(Section::B),
            "C" => Ok(Section::C),
            "D" => Ok(Section::D),
            other => Err(format!("unknown section: {}", other)),
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// ACCOUNT ENUMS
// ============================================================================

/// Role attached to a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Counsellor,
    #[default]
    Student,
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "counsellor" => Ok(Role::Counsellor),
            "student" => Ok(Role::Student),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Admin => "admin",
            Role::Counsellor => "counsellor",
            Role::Student => "student",
        };
        write!(f, "{}", name)
    }
}
