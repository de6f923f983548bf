// Copyright (c) 2026 Sage Federation Contributors
// SPDX-License-Identifier: AGPL-3.0
//! # Federation Request Middleware
//!
//! | Middleware | Applied to | Inserts into extensions |
//! |------------|------------|-------------------------|
//! | [`require_federation_token`] | `/api/federation/agents/*`, `/api/federation/bus` | `FederationTokenPayload` |
//! | [`route_tenant`] | `/federation/api/*` | [`TenantRoute`] |
//!
//! Token admission goes through the session cache before signature
//! verification. Tenant routing never fails a request: an unroutable tenant
//! gets the default store.

use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use tracing::warn;

use crate::domain::routing::{DataStoreConnector, RoutedConnection};
use crate::presentation::api::AppState;
use crate::presentation::error::ApiError;

pub const FEDERATION_TOKEN_HEADER: &str = "x-federation-token";
pub const TENANT_HEADER: &str = "x-tenant-id";
pub const REGION_HEADER: &str = "x-region";

/// Routing decision attached to a `/federation/api/*` request.
#[derive(Debug, Clone)]
pub struct TenantRoute<Conn> {
    pub tenant_id: Option<String>,
    pub region: Option<String>,
    pub routed: RoutedConnection<Conn>,
}

impl<Conn> TenantRoute<Conn> {
    pub fn node_id(&self) -> &str {
        &self.routed.node_id
    }

    pub fn is_federated(&self) -> bool {
        !self.routed.is_default()
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// First non-empty value of a query parameter. Repeated keys are tolerated.
fn query_value(pairs: &[(String, String)], name: &str) -> Option<String> {
    pairs
        .iter()
        .filter(|(key, _)| key == name)
        .map(|(_, value)| value.trim())
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

/// Reject requests without a valid `X-Federation-Token`.
pub async fn require_federation_token<C: DataStoreConnector>(
    State(state): State<Arc<AppState<C>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = header_value(request.headers(), FEDERATION_TOKEN_HEADER)
        .ok_or(ApiError::MissingFederationToken)?;

    let payload = state.auth.authenticate(&token).map_err(|e| {
        warn!(error = %e, path = %request.uri().path(), "Rejected federation token");
        ApiError::InvalidFederationToken
    })?;

    request.extensions_mut().insert(payload);
    Ok(next.run(request).await)
}

/// Resolve the request's tenant/region to a backing-store connection.
///
/// Tenant: `tenantId` query parameter, else `X-Tenant-ID`. Region: `region`
/// query parameter, else `X-Region`. An undecodable query string falls back
/// to the headers.
pub async fn route_tenant<C: DataStoreConnector>(
    State(state): State<Arc<AppState<C>>>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
    mut request: Request,
    next: Next,
) -> Response {
    let pairs = match query {
        Ok(Query(pairs)) => pairs,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "Ignoring undecodable routing query");
            Vec::new()
        }
    };
    let tenant_id = query_value(&pairs, "tenantId").or_else(|| header_value(request.headers(), TENANT_HEADER));
    let region = query_value(&pairs, "region").or_else(|| header_value(request.headers(), REGION_HEADER));

    let routed = match &tenant_id {
        Some(tenant) => state.router.resolve(tenant, region.as_deref().unwrap_or("")).await,
        None => state.router.default_route(),
    };

    request.extensions_mut().insert(TenantRoute {
        tenant_id,
        region,
        routed,
    });
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_query_value_first_non_empty_wins() {
        let query = pairs(&[("tenantId", " "), ("tenantId", "a"), ("tenantId", "b"), ("region", "eu")]);
        assert_eq!(query_value(&query, "tenantId").as_deref(), Some("a"));
        assert_eq!(query_value(&query, "region").as_deref(), Some("eu"));
        assert_eq!(query_value(&query, "missing"), None);
    }
}
