//! HTTP handlers, one module per API area.

pub mod resources;
pub mod site_config;
pub mod uploads;
pub mod users;

/// health
///
/// Liveness probe for the load balancer. Touches nothing.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = String))
)]
pub async fn health() -> &'static str {
    "ok"
}
