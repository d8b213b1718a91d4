//! # API Documentation
//!
//! OpenAPI description of the HTTP endpoints. In development it is served at
//! `/api-docs/openapi.json`, with Swagger UI at `/api-docs`.

use utoipa::OpenApi;
use utoipa::openapi::{self, server::Server};
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;
use crate::utils::constant::{API_DOCS_PATH, API_DOCS_SPEC_PATH};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Astra Service",
        description = "Health and status endpoints backed by Astra DB"
    ),
    paths(handlers::get_health, handlers::get_status),
    tags((name = "system", description = "Service health and status"))
)]
pub struct ApiDoc;

/// The OpenAPI document, with the API prefix as its server URL.
pub fn openapi(prefix: &str) -> openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    let url = if prefix.is_empty() { "/" } else { prefix };
    doc.servers = Some(vec![Server::new(url)]);
    doc
}

pub fn swagger_ui(prefix: &str) -> SwaggerUi {
    SwaggerUi::new(API_DOCS_PATH).url(API_DOCS_SPEC_PATH, openapi(prefix))
}
