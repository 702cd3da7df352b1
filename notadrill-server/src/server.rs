use actix_web::dev::Server;
use actix_web::middleware::{DefaultHeaders, Logger};
use actix_web::{web, App, HttpServer};

use crate::envelope::ALLOW_ORIGIN;
use crate::http::handlers::config_handlers;
use crate::selector::AssetSelector;
use std::net::TcpListener;
use std::sync::Arc;

pub fn run(listener: TcpListener, selector: AssetSelector) -> Result<Server, std::io::Error> {
    let cors_origin = selector.cors_origin().to_owned();
    let selector = Arc::new(selector);

    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(selector.clone()))
            .wrap(cors_headers(&cors_origin))
            .wrap(Logger::default())
            .configure(config_handlers)
    })
    .listen(listener)?
    .run();

    // No .await here!
    Ok(server)
}

/// Make sure every response, routing errors included, carries the CORS header.
/// Envelopes already set it, so those are left untouched.
pub fn cors_headers(cors_origin: &str) -> DefaultHeaders {
    DefaultHeaders::new().header(ALLOW_ORIGIN, cors_origin)
}
