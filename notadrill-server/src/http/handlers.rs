use crate::errors::RouteError;
use crate::selector::AssetSelector;
use actix_web::{guard, http::StatusCode, web, Error, HttpResponse};
use notadrill_openapi::ResponseEnvelope;
use std::sync::Arc;

/// Run the handler and answer with the envelope itself, as a gateway would.
async fn random_asset(selector: web::Data<Arc<AssetSelector>>) -> HttpResponse {
    let envelope = selector.handle(&serde_json::Value::Null).await;
    render_envelope(envelope)
}

/// Run the handler on the posted event and return the raw envelope as JSON.
async fn invoke(
    selector: web::Data<Arc<AssetSelector>>,
    payload: web::Bytes,
) -> Result<HttpResponse, Error> {
    let event = if payload.iter().all(u8::is_ascii_whitespace) {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&payload).map_err(RouteError::InvalidEvent)?
    };

    let envelope = selector.handle(&event).await;
    Ok(HttpResponse::Ok().json(envelope))
}

pub fn render_envelope(envelope: ResponseEnvelope) -> HttpResponse {
    let status =
        StatusCode::from_u16(envelope.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let mut builder = HttpResponse::build(status);
    for (name, value) in envelope.headers.iter() {
        builder.header(name.as_str(), value.as_str());
    }
    builder.body(envelope.body)
}

/// 404 handler
async fn p404() -> Result<&'static str, Error> {
    Err(RouteError::NotFound.into())
}

/// Not allowed handler
async fn method_not_allowed() -> Result<&'static str, Error> {
    Err(RouteError::MethodNotAllowed.into())
}

pub fn config_handlers(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/")
            .name("index")
            .route(web::get().to(random_asset))
            .route(web::route().to(method_not_allowed)),
    )
    .service(
        web::resource("/random")
            .name("random_asset")
            .route(web::get().to(random_asset))
            .route(web::route().to(method_not_allowed)),
    )
    .service(
        web::resource("/invoke")
            .name("invoke")
            .route(web::post().to(invoke))
            .route(web::route().to(method_not_allowed)),
    )
    .service(
        web::scope("").default_service(
            web::resource("")
                // 404 for GET request
                .route(web::get().to(p404))
                // all requests that are not `GET`
                .route(
                    web::route()
                        .guard(guard::Not(guard::Get()))
                        .to(method_not_allowed),
                ),
        ),
    );
}
