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

use crate::models::ResourceKind;
use reqwest::StatusCode;
use thiserror::Error;

/// Longest response body kept inside an error.
const MAX_ERROR_BODY_LENGTH: usize = 200;

/// Failure of a single API call.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("no response from {url}: {source}")]
    NoResponse {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP Status Code: {} at {url}", .status.as_u16())]
    Status {
        url: String,
        status: StatusCode,
        body: String,
    },

    #[error("invalid response from {url}: {message}")]
    InvalidResponse { url: String, message: String },
}

impl ApiError {
    pub fn from_status(url: impl Into<String>, status: StatusCode, body: &str) -> Self {
        let body = if body.len() > MAX_ERROR_BODY_LENGTH {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}...", &body[..end])
        } else {
            body.to_string()
        };
        ApiError::Status {
            url: url.into(),
            status,
            body,
        }
    }

    /// HTTP status of the response, if one arrived.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("ERROR: Not able to login into ExtremeCloud IQ - no response!")]
    NoResponse(#[source] ApiError),

    #[error("Error getting access token - HTTP Status Code: {}", .0.as_u16())]
    Status(StatusCode),

    #[error("Unknown Error: Unable to gain access token. Aborting...")]
    MissingToken,
}

impl From<ApiError> for AuthError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Status { status, .. } => AuthError::Status(status),
            ApiError::InvalidResponse { .. } => AuthError::MissingToken,
            other @ ApiError::NoResponse { .. } => AuthError::NoResponse(other),
        }
    }
}

/// A listing walk stopped on one of its pages.
#[derive(Debug, Error)]
#[error("Error collecting {} (page {page}): {source}", .kind.plural())]
pub struct FetchError {
    pub kind: ResourceKind,
    pub page: u32,
    #[source]
    pub source: ApiError,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_errors_map_to_auth_status() {
        let err = ApiError::from_status("https://x.test/login", StatusCode::UNAUTHORIZED, "");
        let auth: AuthError = err.into();
        assert!(matches!(auth, AuthError::Status(StatusCode::UNAUTHORIZED)));
        assert_eq!(
            auth.to_string(),
            "Error getting access token - HTTP Status Code: 401"
        );
    }

    #[test]
    fn long_bodies_are_truncated() {
        let body = "x".repeat(500);
        let err = ApiError::from_status("u", StatusCode::BAD_REQUEST, &body);
        match err {
            ApiError::Status { body, .. } => assert_eq!(body.len(), MAX_ERROR_BODY_LENGTH + 3),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn fetch_error_names_kind_and_page() {
        let err = FetchError {
            kind: ResourceKind::UserProfile,
            page: 2,
            source: ApiError::from_status("u", StatusCode::INTERNAL_SERVER_ERROR, ""),
        };
        assert!(err.to_string().starts_with("Error collecting User Profiles (page 2)"));
    }
}
