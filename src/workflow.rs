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

//! Bulk create and delete sweeps over VLAN profiles and user profiles.
//!
//! Creation stops at the first failed call and leaves earlier profiles in
//! place. Deletion isolates failures per item and keeps going.

use crate::client::ProfileApi;
use crate::error::{ApiError, FetchError};
use crate::fetch::fetch_all;
use crate::models::{CreateUserProfile, CreateVlanProfile, Named, Page, ResourceKind};
use std::collections::BTreeSet;
use std::io::{self, Write};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Error creating {kind} {name}: {source}")]
    Create {
        kind: ResourceKind,
        name: String,
        #[source]
        source: ApiError,
    },

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("writing progress output: {0}")]
    Output(#[from] io::Error),
}

/// Ids that a delete sweep must leave alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProtectLists {
    pub vlan_profiles: BTreeSet<u64>,
    pub user_profiles: BTreeSet<u64>,
}

impl ProtectLists {
    pub fn new(
        vlan_profiles: impl IntoIterator<Item = u64>,
        user_profiles: impl IntoIterator<Item = u64>,
    ) -> Self {
        Self {
            vlan_profiles: vlan_profiles.into_iter().collect(),
            user_profiles: user_profiles.into_iter().collect(),
        }
    }

    fn for_kind(&self, kind: ResourceKind) -> &BTreeSet<u64> {
        match kind {
            ResourceKind::VlanProfile => &self.vlan_profiles,
            ResourceKind::UserProfile => &self.user_profiles,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateReport {
    /// Server ids of the VLAN profiles created, in VLAN order.
    pub vlan_profile_ids: Vec<u64>,
    pub user_profiles: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepTally {
    pub deleted: usize,
    pub protected: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteReport {
    pub user_profiles: SweepTally,
    pub vlan_profiles: SweepTally,
}

/// Create one VLAN profile per id in `start..=end`, each optionally followed by
/// a user profile of the same name pointing at it.
pub fn create_range<A, W>(
    api: &A,
    start: u16,
    end: u16,
    with_user_profile: bool,
    out: &mut W,
) -> Result<CreateReport, WorkflowError>
where
    A: ProfileApi + ?Sized,
    W: Write + ?Sized,
{
    info!(start, end, with_user_profile, "creating VLAN profiles");
    let mut report = CreateReport::default();

    for vlan_id in start..=end {
        let request = CreateVlanProfile::for_vlan(vlan_id);
        writeln!(out, "Creating VLAN: {}", vlan_id)?;
        let created = api
            .create_vlan_profile(&request)
            .map_err(|source| WorkflowError::Create {
                kind: ResourceKind::VlanProfile,
                name: request.name.clone(),
                source,
            })?;
        debug!(id = created.id, vlan = ?created.default_vlan_id, "VLAN profile created");
        report.vlan_profile_ids.push(created.id);

        if with_user_profile {
            let profile = CreateUserProfile {
                name: request.name.clone(),
                vlan_profile_id: created.id,
            };
            api.create_user_profile(&profile)
                .map_err(|source| WorkflowError::Create {
                    kind: ResourceKind::UserProfile,
                    name: profile.name.clone(),
                    source,
                })?;
            writeln!(out, "Creating User Profile: {}", vlan_id)?;
            report.user_profiles += 1;
        } else {
            writeln!(out, "Skipping User Profile creation")?;
        }
    }

    info!(
        vlan_profiles = report.vlan_profile_ids.len(),
        user_profiles = report.user_profiles,
        "create run finished"
    );
    Ok(report)
}

/// Delete every unprotected user profile, then every unprotected VLAN profile.
///
/// User profiles go first because a VLAN profile cannot be removed while a
/// user profile references it.
pub fn delete_all<A, W>(
    api: &A,
    protect: &ProtectLists,
    out: &mut W,
) -> Result<DeleteReport, WorkflowError>
where
    A: ProfileApi + ?Sized,
    W: Write + ?Sized,
{
    info!("deleting user profiles and VLAN profiles");

    let user_profiles = collect(ResourceKind::UserProfile, out, |page, limit| {
        api.list_user_profiles(page, limit)
    })?;
    for profile in &user_profiles {
        if let Some(vlan_profile_id) = profile.vlan_profile_id {
            debug!(id = profile.id, vlan_profile_id, "user profile references VLAN profile");
        }
    }
    let user_tally = sweep(
        ResourceKind::UserProfile,
        &user_profiles,
        protect,
        |id| api.delete_user_profile(id),
        out,
    )?;

    let vlan_profiles = collect(ResourceKind::VlanProfile, out, |page, limit| {
        api.list_vlan_profiles(page, limit)
    })?;
    let vlan_tally = sweep(
        ResourceKind::VlanProfile,
        &vlan_profiles,
        protect,
        |id| api.delete_vlan_profile(id),
        out,
    )?;

    let report = DeleteReport {
        user_profiles: user_tally,
        vlan_profiles: vlan_tally,
    };
    info!(?report, "delete run finished");
    Ok(report)
}

fn collect<T, F, W>(kind: ResourceKind, out: &mut W, fetch_page: F) -> Result<Vec<T>, WorkflowError>
where
    F: FnMut(u32, u32) -> Result<Page<T>, ApiError>,
    W: Write + ?Sized,
{
    fetch_all(kind, fetch_page, |page, total| -> Result<(), WorkflowError> {
        writeln!(
            out,
            "Completed page {} of {} collecting {}",
            page,
            total,
            kind.plural()
        )?;
        out.flush()?;
        Ok(())
    })
}

fn sweep<T, D, W>(
    kind: ResourceKind,
    items: &[T],
    protect: &ProtectLists,
    mut delete: D,
    out: &mut W,
) -> Result<SweepTally, WorkflowError>
where
    T: Named,
    D: FnMut(u64) -> Result<(), ApiError>,
    W: Write + ?Sized,
{
    let protected = protect.for_kind(kind);
    let mut tally = SweepTally::default();

    for item in items {
        if protected.contains(&item.id()) {
            tally.protected += 1;
            continue;
        }
        match delete(item.id()) {
            Ok(()) => {
                tally.deleted += 1;
                writeln!(out, "Successfully deleted {}: {}", kind, item.name())?;
            }
            Err(err) => {
                tally.failed += 1;
                warn!(%kind, id = item.id(), name = item.name(), error = %err, "delete failed");
                match err.status() {
                    Some(status) => writeln!(
                        out,
                        "Error deleting {} {} - HTTP Status Code: {}. Check the Used By column in ExtremeCloud IQ.",
                        kind,
                        item.name(),
                        status.as_u16()
                    )?,
                    None => writeln!(
                        out,
                        "ERROR: Not able to delete {} {} in ExtremeCloud IQ: {}",
                        kind,
                        item.name(),
                        err
                    )?,
                }
            }
        }
    }

    Ok(tally)
}
