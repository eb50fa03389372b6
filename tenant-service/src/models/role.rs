//! Agency role hierarchy.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Roles a user can hold within an agency, highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    MasterAdmin,
    AgencyAdmin,
    AgencyManager,
    AgencyUser,
    AgencyViewer,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::MasterAdmin,
        Role::AgencyAdmin,
        Role::AgencyManager,
        Role::AgencyUser,
        Role::AgencyViewer,
    ];

    /// Position in the hierarchy. Higher levels include every lower level.
    pub const fn level(&self) -> u8 {
        match self {
            Role::MasterAdmin => 100,
            Role::AgencyAdmin => 80,
            Role::AgencyManager => 60,
            Role::AgencyUser => 40,
            Role::AgencyViewer => 20,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::MasterAdmin => "MASTER_ADMIN",
            Role::AgencyAdmin => "AGENCY_ADMIN",
            Role::AgencyManager => "AGENCY_MANAGER",
            Role::AgencyUser => "AGENCY_USER",
            Role::AgencyViewer => "AGENCY_VIEWER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MASTER_ADMIN" => Ok(Role::MasterAdmin),
            "AGENCY_ADMIN" => Ok(Role::AgencyAdmin),
            "AGENCY_MANAGER" => Ok(Role::AgencyManager),
            "AGENCY_USER" => Ok(Role::AgencyUser),
            "AGENCY_VIEWER" => Ok(Role::AgencyViewer),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

/// Level of a stored role name; names outside the hierarchy get 0.
pub fn role_level(name: &str) -> u8 {
    name.parse::<Role>().map(|role| role.level()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_are_strictly_ordered() {
        let levels: Vec<u8> = Role::ALL.iter().map(Role::level).collect();
        assert_eq!(levels, vec![100, 80, 60, 40, 20]);
    }

    #[test]
    fn unknown_role_names_have_no_level() {
        assert_eq!(role_level("OWNER"), 0);
        assert_eq!(role_level("agency_admin"), 0);
        assert_eq!(role_level(""), 0);
        assert_eq!(role_level("AGENCY_MANAGER"), 60);
    }

    #[test]
    fn role_names_round_trip_through_display() {
        for role in Role::ALL {
            assert_eq!(role.to_string().parse::<Role>(), Ok(role));
        }
    }
}
