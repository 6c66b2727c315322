//! Fairing implementation
use log::{debug, error};
use rocket::http::uri::Origin as UriOrigin;
use rocket::http::{self, Status};
use rocket::{Build, Data, Request, Rocket};

use crate::{engine, Cors};

/// Route that answers preflights which are not passed through to the application
#[derive(Clone)]
struct PreflightRouteHandler {}

#[rocket::async_trait]
impl rocket::route::Handler for PreflightRouteHandler {
    async fn handle<'r>(&self, request: &'r Request<'_>, _: Data<'r>) -> rocket::route::Outcome<'r> {
        rocket::route::Outcome::from(request, Status::NoContent)
    }
}

/// Create a new `Route` for preflight handling
fn preflight_route(rank: isize) -> rocket::Route {
    rocket::Route::ranked(rank, http::Method::Options, "/", PreflightRouteHandler {})
}

/// Modifies a `Request` to route to the preflight handler
fn route_to_preflight_handler(options: &Cors, request: &mut Request<'_>) {
    match UriOrigin::parse_owned(options.fairing_route_base.clone()) {
        Ok(uri) => {
            debug!("CORS: Routing preflight {} to {}", request, uri);
            request.set_uri(uri);
        }
        Err(e) => error!("CORS: Unable to route preflight to the fairing route: {}", e),
    }
}

#[rocket::async_trait]
impl rocket::fairing::Fairing for Cors {
    fn info(&self) -> rocket::fairing::Info {
        rocket::fairing::Info {
            name: "CORS",
            kind: rocket::fairing::Kind::Ignite
                | rocket::fairing::Kind::Request
                | rocket::fairing::Kind::Response,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        if let Err(e) = UriOrigin::parse(&self.fairing_route_base) {
            error!(
                "Error attaching CORS fairing: invalid route base {:?}: {}",
                self.fairing_route_base, e
            );
            return Err(rocket);
        }

        Ok(rocket.mount(
            self.fairing_route_base.as_str(),
            vec![preflight_route(self.fairing_route_rank)],
        ))
    }

    async fn on_request(&self, request: &mut Request<'_>, _: &mut Data<'_>) {
        if !self.policy.enabled() {
            return;
        }

        if engine::decide(&self.policy, &*request).is_short_circuit() {
            route_to_preflight_handler(self, request);
        }
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut rocket::Response<'r>) {
        if !self.policy.enabled() {
            return;
        }

        self.decide(request).apply(response);
    }
}
