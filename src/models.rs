// xiqctl - bulk VLAN / user profile tool for ExtremeCloud IQ
// Copyright (C) 2024 Mathias Uhl <mathiasuhl@gmx.de>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Request and response records for the ExtremeCloud IQ endpoints used by xiqctl.
//!
//! Only the fields the workflows read are modelled; everything else the API
//! returns is ignored on deserialization.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Highest VLAN tag accepted when creating profiles.
pub const MAX_VLAN_ID: u16 = 4094;

/// Page size requested from every listing endpoint.
pub const PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    VlanProfile,
    UserProfile,
}

impl ResourceKind {
    pub fn path(self) -> &'static str {
        match self {
            ResourceKind::VlanProfile => "vlan-profiles",
            ResourceKind::UserProfile => "user-profiles",
        }
    }

    pub fn plural(self) -> &'static str {
        match self {
            ResourceKind::VlanProfile => "VLAN Profiles",
            ResourceKind::UserProfile => "User Profiles",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::VlanProfile => f.write_str("VLAN"),
            ResourceKind::UserProfile => f.write_str("User Profile"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateVlanProfile {
    pub name: String,
    pub default_vlan_id: u16,
    pub enable_classification: bool,
}

impl CreateVlanProfile {
    /// Profile named after its own VLAN tag, classification off.
    pub fn for_vlan(vlan_id: u16) -> Self {
        Self {
            name: vlan_id.to_string(),
            default_vlan_id: vlan_id,
            enable_classification: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateUserProfile {
    pub name: String,
    pub vlan_profile_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VlanProfile {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub default_vlan_id: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserProfile {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub vlan_profile_id: Option<u64>,
}

/// Listing envelope shared by every paginated endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    pub page: u32,
    pub total_pages: u32,
}

/// Something a delete sweep can name and address.
pub trait Named {
    fn id(&self) -> u64;
    fn name(&self) -> &str;
}

impl Named for VlanProfile {
    fn id(&self) -> u64 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for UserProfile {
    fn id(&self) -> u64 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}
