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

use crate::error::{ApiError, FetchError};
use crate::models::{PAGE_SIZE, Page, ResourceKind};
use tracing::debug;

/// Walk every page of a listing endpoint and return the items in server order.
///
/// The page count reported by the first response bounds the walk. `on_page`
/// runs after each page with `(page, total_pages)` before the next page is
/// requested; an error from it stops the walk. A failing page aborts the whole
/// fetch and nothing collected so far is returned.
pub fn fetch_all<T, E, F, P>(
    kind: ResourceKind,
    mut fetch_page: F,
    mut on_page: P,
) -> Result<Vec<T>, E>
where
    F: FnMut(u32, u32) -> Result<Page<T>, ApiError>,
    P: FnMut(u32, u32) -> Result<(), E>,
    E: From<FetchError>,
{
    let mut items = Vec::new();
    let mut page = 1;
    let mut total_pages = 1;

    while page <= total_pages {
        debug!(%kind, page, "fetching page");
        let response = fetch_page(page, PAGE_SIZE).map_err(|source| FetchError {
            kind,
            page,
            source,
        })?;

        if page == 1 {
            total_pages = response.total_pages;
        }
        debug!(%kind, page, reported_page = response.page, total_pages, "page received");
        items.extend(response.data);
        on_page(page, response.total_pages)?;
        page += 1;
    }

    Ok(items)
}
