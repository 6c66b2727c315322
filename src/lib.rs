//! Cross-origin resource sharing (CORS) policy engine for [Rocket](https://rocket.rs/)
//! applications
//!
//! ## Requirements
//!
//! - Rocket >= 0.5
//!
//! ## Installation
//!
//! Add the following to Cargo.toml:
//!
//! ```toml
//! rocket_cors_policy = "0.1.0"
//! ```
//!
//! ## Features
//!
//! By default, a `serialization` feature is enabled in this crate that allows you to (de)serialize
//! [`CorsSettings`] and load them from Rocket's configuration. If you would like to disable this,
//! simply change your `Cargo.toml` to:
//!
//! ```toml
//! rocket_cors_policy = { version = "0.1.0", default-features = false }
//! ```
//!
//! ## How it works
//!
//! [`CorsSettings`] is the raw configuration. It is normalized once into a [`Policy`], which is
//! never mutated afterwards and is wrapped in a [`Cors`].
//!
//! For every request, the engine looks at the method and at the `Origin`,
//! `Access-Control-Request-Method` and `Access-Control-Request-Headers` headers and returns an
//! [`Outcome`]: the list of headers to write to the response. A request that fails a check is
//! never rejected. Its response simply carries no `Access-Control-*` headers and the browser
//! blocks it on the client side.
//!
//! - `OPTIONS` requests are preflights. The response always carries
//!   `Vary: Origin, Access-Control-Request-Method, Access-Control-Request-Headers`. When origin,
//!   requested method and requested headers are all allowed, the origin (or `*`), the requested
//!   method and headers, credentials and max age are sent.
//! - Any other request is an actual request. `Origin` is added to `Vary`, and when origin and
//!   method are allowed, the origin (or `*`), the exposed headers and credentials are sent.
//!
//! ## Two modes of operation
//!
//! |                                          | Fairing | Request Guard |
//! |:----------------------------------------:|:-------:|:-------------:|
//! |         Must apply to all routes         |    ✔    |       ✗       |
//! |  Preflights answered without any route   |    ✔    |       ✗       |
//! |     May define custom OPTIONS routes     |    ✗    |       ✔       |
//!
//! ### Fairing
//!
//! Attach a [`Cors`] to Rocket. Preflights are answered with `204 No Content` by a route that
//! the fairing mounts, unless `options_passthrough` is set. Every response is decorated after
//! your route has run.
//!
//! ```rust
//! use rocket::{get, routes};
//! use rocket_cors_policy::CorsSettings;
//!
//! #[get("/")]
//! fn cors() -> &'static str {
//!     "Hello CORS"
//! }
//!
//! fn rocket() -> rocket::Rocket<rocket::Build> {
//!     let cors = CorsSettings {
//!         allowed_origins: vec!["https://www.acme.com".to_string()],
//!         allowed_methods: vec!["GET".to_string()],
//!         allowed_headers: vec!["Authorization".to_string(), "Accept".to_string()],
//!         allow_credentials: true,
//!         ..Default::default()
//!     }
//!     .to_cors();
//!
//!     rocket::build().mount("/", routes![cors]).attach(cors)
//! }
//!
//! fn main() {
//!     // `.launch()` in an async main
//!     let client = rocket::local::blocking::Client::tracked(rocket()).expect("valid rocket");
//! }
//! ```
//!
//! The settings can also come from the `cors` table of `Rocket.toml` by attaching
//! [`config_fairing`] instead.
//!
//! ### Request Guard
//!
//! Put a [`Cors`] into Rocket's managed state and take a [`Guard`] in the routes that should
//! carry CORS headers. Mount [`catch_all_options_routes`] or your own `OPTIONS` routes for
//! preflights.
//!
//! ```rust
//! use rocket::{get, routes};
//! use rocket_cors_policy::{CorsSettings, Guard, Responder};
//!
//! #[get("/")]
//! fn responder(cors: Guard) -> Responder<&'static str> {
//!     cors.responder("Hello CORS!")
//! }
//!
//! fn rocket() -> rocket::Rocket<rocket::Build> {
//!     let cors = CorsSettings {
//!         allowed_origins: vec!["https://*.acme.com".to_string()],
//!         ..Default::default()
//!     }
//!     .to_cors();
//!
//!     rocket::build()
//!         .mount("/", routes![responder])
//!         .mount("/", rocket_cors_policy::catch_all_options_routes())
//!         .manage(cors)
//! }
//!
//! fn main() {
//!     let client = rocket::local::blocking::Client::tracked(rocket()).expect("valid rocket");
//!     let response = client.options("/").dispatch();
//!     assert_eq!(response.status(), rocket::http::Status::NoContent);
//! }
//! ```
//!
//! To read the settings from the `cors` table of `Rocket.toml`, attach
//! [`config_managed_state`] instead of calling `manage`.
//!
//! ## Other hosts
//!
//! The engine does not depend on Rocket's types. Implement [`RequestView`](headers::RequestView)
//! and [`HeaderSink`](headers::HeaderSink) for your request and response, or use
//! [`RequestParts`](headers::RequestParts) and [`ResponseParts`](headers::ResponseParts), and call
//! [`Cors::process`].
//!
//! ```rust
//! use rocket_cors_policy::CorsSettings;
//! use rocket_cors_policy::headers::{RequestParts, ResponseParts};
//!
//! let cors = CorsSettings {
//!     allowed_origins: vec!["https://www.acme.com".to_string()],
//!     ..Default::default()
//! }
//! .to_cors();
//!
//! let request = RequestParts::new("GET").with_header("Origin", "https://www.acme.com");
//! let response = cors.process(&request, |_| ResponseParts::new());
//! assert_eq!(
//!     response.get_one("Access-Control-Allow-Origin"),
//!     Some("https://www.acme.com")
//! );
//! ```

#![deny(
    missing_docs,
    non_camel_case_types,
    non_shorthand_field_patterns,
    non_upper_case_globals,
    overflowing_literals,
    path_statements,
    trivial_casts,
    trivial_numeric_casts,
    unconditional_recursion,
    unreachable_code,
    unused_allocation,
    unused_assignments,
    unused_attributes,
    unused_comparisons,
    unused_extern_crates,
    unused_imports,
    unused_import_braces,
    unused_must_use,
    unused_mut,
    unused_parens,
    unused_unsafe,
    unused_variables,
    while_true
)]
#![doc(test(attr(allow(unused_variables))))]

#[cfg(test)]
#[macro_use]
mod test_macros;
mod config;
mod fairing;

pub mod engine;
pub mod headers;
pub mod policy;

use std::error;
use std::fmt;

use log::{debug, error, info};
use rocket::http::{self, Status};
use rocket::outcome::Outcome as RocketOutcome;
use rocket::request::{FromRequest, Request};
use rocket::{response, State};

#[cfg(feature = "serialization")]
pub use crate::config::{config_fairing, config_managed_state};
pub use crate::config::{CorsSettings, CONFIG_KEY};
pub use crate::engine::{Denial, HeaderMutation, Mode, Outcome, RequestKind};
pub use crate::policy::Policy;

use crate::headers::{HeaderSink, RequestView};

/// Errors during operations
///
/// The engine itself never fails. These errors come from the integration with Rocket.
///
/// This enum implements `rocket::response::Responder` which will return an appropriate status code
/// while printing out the error in the console.
#[derive(Debug)]
pub enum Error {
    /// A CORS Request Guard was used, but no CORS Options was available in Rocket's state
    ///
    /// This is a misconfiguration. Use `Rocket::manage` to add a CORS options to managed state.
    MissingCorsInRocketState,
    /// The `cors` table of Rocket's configuration could not be read
    #[cfg(feature = "serialization")]
    Config(rocket::figment::Error),
}

impl Error {
    fn status(&self) -> Status {
        match *self {
            Error::MissingCorsInRocketState => Status::InternalServerError,
            #[cfg(feature = "serialization")]
            Error::Config(_) => Status::InternalServerError,
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            #[cfg(feature = "serialization")]
            Error::Config(ref e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Error::MissingCorsInRocketState => write!(
                f,
                "A CORS Request Guard was used, but no CORS Options was available in Rocket's state"
            ),
            #[cfg(feature = "serialization")]
            Error::Config(ref e) => write!(f, "Invalid CORS configuration: {}", e),
        }
    }
}

#[cfg(feature = "serialization")]
impl From<rocket::figment::Error> for Error {
    fn from(error: rocket::figment::Error) -> Self {
        Error::Config(error)
    }
}

impl<'r, 'o: 'r> response::Responder<'r, 'o> for Error {
    fn respond_to(self, _: &'r Request<'_>) -> Result<response::Response<'o>, Status> {
        error!("CORS Error: {}", self);
        Err(self.status())
    }
}

/// Response generator and [Fairing](https://rocket.rs/guide/fairings/) for CORS
///
/// Build one from [`CorsSettings`] and use it as a Fairing, as managed state for [`Guard`], or
/// directly through [`Cors::process`]. It is immutable and cheap to share.
///
/// ```rust
/// let cors = rocket_cors_policy::CorsSettings::default().to_cors();
/// assert!(cors.policy().enabled());
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Cors {
    policy: Policy,
    debug: bool,
    fairing_route_base: String,
    fairing_route_rank: isize,
}

impl Cors {
    /// Normalize `settings` into a `Cors`. This never fails.
    pub fn new(settings: &CorsSettings) -> Self {
        let cors = Self {
            policy: Policy::new(settings),
            debug: settings.debug,
            fairing_route_base: settings.fairing_route_base.clone(),
            fairing_route_rank: settings.fairing_route_rank,
        };
        if cors.debug {
            cors.trace_init();
        }
        cors
    }

    /// Log the normalized policy at debug level
    fn trace_init(&self) {
        let policy = &self.policy;
        let mut methods: Vec<&String> = policy.allowed_methods().iter().collect();
        methods.sort();
        let mut headers: Vec<&String> = policy.allowed_headers().iter().collect();
        headers.sort();

        debug!(
            "CORS: Init, enabled: {}, allowed methods: {:?}, allowed headers: {:?}",
            policy.enabled(),
            methods,
            headers
        );
    }

    /// The normalized policy
    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Run the engine on a request. The decision is logged when `debug` is configured.
    ///
    /// This does not look at whether CORS is enabled. Adapters check that first.
    pub fn decide<R: RequestView + ?Sized>(&self, request: &R) -> Outcome {
        let outcome = engine::decide(&self.policy, request);
        if self.debug {
            trace(&outcome);
        }
        outcome
    }

    /// Handle a request for a host that is not Rocket.
    ///
    /// When CORS is disabled, `next` runs and its response is returned untouched. Otherwise
    /// `next` produces the response first and the CORS headers are written to it afterwards.
    ///
    /// `next` runs for preflights as well. Hosts that want to answer preflights without their
    /// own handlers should check [`Outcome::is_short_circuit`] on [`Cors::decide`] first, the
    /// way the fairing does.
    pub fn process<R, S, F>(&self, request: &R, next: F) -> S
    where
        R: RequestView + ?Sized,
        S: HeaderSink,
        F: FnOnce(&R) -> S,
    {
        if !self.policy.enabled() {
            return next(request);
        }

        let mut response = next(request);
        self.decide(request).apply(&mut response);
        response
    }
}

impl<'a> From<&'a CorsSettings> for Cors {
    fn from(settings: &'a CorsSettings) -> Self {
        Self::new(settings)
    }
}

impl Default for Cors {
    fn default() -> Self {
        Self::new(&CorsSettings::default())
    }
}

/// Log a decision at debug level
fn trace(outcome: &Outcome) {
    match (outcome.kind(), outcome.denial()) {
        (RequestKind::Preflight, Some(denial)) => {
            debug!("CORS: Preflight aborted: {}", denial)
        }
        (RequestKind::Actual, Some(denial)) => {
            debug!("CORS: Actual request no headers added: {}", denial)
        }
        (kind, None) => debug!("CORS: {} response headers: {:?}", kind, outcome.headers()),
    }
}

/// A [request guard](https://rocket.rs/guide/requests/#request-guards) that runs the CORS engine
/// with the [`Cors`] in Rocket's managed state.
///
/// A request that fails the CORS checks is not rejected. The guard only decides which headers
/// the response gets.
///
/// See the documentation at the [crate root](index.html) for usage information.
#[derive(Debug)]
pub struct Guard {
    outcome: Option<Outcome>,
}

impl Guard {
    fn new(outcome: Option<Outcome>) -> Self {
        Self { outcome }
    }

    /// The decision for this request. `None` when CORS is disabled.
    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    /// Consumes the Guard and return  a `Responder` that wraps a
    /// provided `rocket:response::Responder` with CORS headers
    pub fn responder<R>(self, responder: R) -> Responder<R> {
        Responder::new(responder, self.outcome)
    }

    /// Merge a `rocket::Response` with this CORS Guard. This is usually used in the final step
    /// of a route to return a value for the route.
    pub fn response<'r>(&self, base: response::Response<'r>) -> response::Response<'r> {
        let mut response = base;
        if let Some(ref outcome) = self.outcome {
            outcome.apply(&mut response);
        }
        response
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Guard {
    type Error = Error;

    async fn from_request(request: &'r Request<'_>) -> rocket::request::Outcome<Self, Self::Error> {
        let cors = match request.guard::<&State<Cors>>().await {
            RocketOutcome::Success(cors) => cors,
            _ => {
                let error = Error::MissingCorsInRocketState;
                error!("CORS Error: {}", error);
                return RocketOutcome::Error((error.status(), error));
            }
        };

        if !cors.policy().enabled() {
            return RocketOutcome::Success(Guard::new(None));
        }
        RocketOutcome::Success(Guard::new(Some(cors.decide(request))))
    }
}

/// A [`Responder`](https://rocket.rs/guide/responses/#responder) which will simply wraps another
/// `Responder` with CORS headers.
///
/// See the documentation at the [crate root](index.html) for usage information.
#[derive(Debug)]
pub struct Responder<R> {
    responder: R,
    outcome: Option<Outcome>,
}

impl<R> Responder<R> {
    fn new(responder: R, outcome: Option<Outcome>) -> Self {
        Self { responder, outcome }
    }
}

impl<'r, 'o: 'r, R: response::Responder<'r, 'o>> response::Responder<'r, 'o> for Responder<R> {
    fn respond_to(self, request: &'r Request<'_>) -> response::Result<'o> {
        let mut response = self.responder.respond_to(request)?;
        if let Some(ref outcome) = self.outcome {
            outcome.apply(&mut response);
        }
        Ok(response)
    }
}

/// Returns a "catch all" OPTIONS route that you can mount to catch all OPTIONS request. Only works
/// if you have put a `Cors` struct into Rocket's managed state.
///
/// This route has very high rank (and therefore low priority) of
/// [max value](https://doc.rust-lang.org/nightly/std/primitive.isize.html#associatedconstant.MAX)
/// so you can define your own to override this route's behaviour.
///
/// See the documentation at the [crate root](index.html) for usage information.
pub fn catch_all_options_routes() -> Vec<rocket::Route> {
    // A trailing `<..>` segment also matches "/".
    vec![rocket::Route::ranked(
        isize::MAX,
        http::Method::Options,
        "/<catch_all_options_route..>",
        CatchAllOptionsRouteHandler {},
    )]
}

/// Handler for the "catch all options route"
#[derive(Clone)]
struct CatchAllOptionsRouteHandler {}

#[rocket::async_trait]
impl rocket::route::Handler for CatchAllOptionsRouteHandler {
    async fn handle<'r>(
        &self,
        request: &'r Request<'_>,
        _: rocket::Data<'r>,
    ) -> rocket::route::Outcome<'r> {
        let guard: Guard = match request.guard().await {
            RocketOutcome::Success(guard) => guard,
            RocketOutcome::Error((status, _)) | RocketOutcome::Forward(status) => {
                return rocket::route::Outcome::Error(status)
            }
        };

        info!(
            "\"Catch all\" handling of CORS `OPTIONS` preflight for request {}",
            request
        );

        rocket::route::Outcome::from(request, guard.responder(Status::NoContent))
    }
}
