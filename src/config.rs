//! CORS settings and loading them from Rocket's configuration
#[cfg(feature = "serialization")]
use log::error;
#[cfg(feature = "serialization")]
use rocket::fairing::AdHoc;
#[cfg(feature = "serialization")]
use rocket::figment::Figment;
#[cfg(feature = "serialization")]
use rocket::{Build, Rocket};
#[cfg(feature = "serialization")]
use serde_derive::{Deserialize, Serialize};

use crate::Cors;

/// Name of the table in Rocket's configuration that holds [`CorsSettings`]
pub const CONFIG_KEY: &str = "cors";

/// Raw CORS configuration.
///
/// Nothing here is validated. [`CorsSettings::to_cors`] normalizes the settings into a
/// [`Policy`](crate::policy::Policy) once, and settings that make no sense result in restrictive
/// behaviour rather than an error.
///
/// This struct can be deserialized by serde with the `serialization` feature which is enabled by
/// default. Every field is optional and falls back to its default.
///
/// # Examples
///
/// ## Pure default
/// ```rust
/// let default = rocket_cors_policy::CorsSettings::default();
/// assert!(default.enabled);
/// assert!(default.allowed_origins.is_empty());
/// ```
///
/// ## `Rocket.toml`
/// ```toml
/// [default.cors]
/// allowed_origins = ["https://www.acme.com", "https://*.acme.com"]
/// allowed_methods = ["GET", "POST"]
/// allowed_headers = ["Authorization", "Accept"]
/// exposed_headers = ["X-Custom"]
/// allow_credentials = true
/// max_age = 3600
/// ```
#[derive(Eq, PartialEq, Clone, Debug)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serialization", serde(default))]
pub struct CorsSettings {
    /// Whether CORS headers are added at all. When `false`, requests and responses pass
    /// through untouched.
    ///
    /// Defaults to `true`.
    pub enabled: bool,
    /// Origins that may make cross-origin requests, matched case-insensitively against the
    /// `Origin` request header.
    ///
    /// `"*"` allows every origin. An origin with a single `*`, like `https://*.acme.com`, allows
    /// every origin that starts with the text before the `*` and ends with the text after it.
    ///
    /// Defaults to an empty list, which allows no origin.
    pub allowed_origins: Vec<String>,
    /// Methods that may be used, matched case-insensitively.
    ///
    /// `OPTIONS` is always allowed unless this list is empty. An empty list denies every
    /// request, preflights included.
    ///
    /// Defaults to `[GET, HEAD, POST, OPTIONS, PUT, PATCH, DELETE]`
    pub allowed_methods: Vec<String>,
    /// Header names a preflight may ask for in `Access-Control-Request-Headers`.
    ///
    /// `"*"` allows every header and so does an empty list. `Origin` is always allowed.
    ///
    /// Defaults to an empty list.
    pub allowed_headers: Vec<String>,
    /// Headers listed in `Access-Control-Expose-Headers` on actual requests, in order.
    ///
    /// Defaults to an empty list.
    pub exposed_headers: Vec<String>,
    /// Allows users to make authenticated requests.
    /// If true, injects the `Access-Control-Allow-Credentials` header in responses and the
    /// request `Origin` is echoed instead of `*`.
    ///
    /// Defaults to `false`.
    pub allow_credentials: bool,
    /// Seconds a preflight result may be cached, sent as `Access-Control-Max-Age`. Zero or
    /// less sends nothing.
    ///
    /// Defaults to `0`.
    pub max_age: i64,
    /// When `false`, preflight requests are answered right away and never reach the
    /// application's own `OPTIONS` routes.
    ///
    /// Defaults to `false`.
    pub options_passthrough: bool,
    /// Log every CORS decision at debug level.
    ///
    /// Defaults to `false`.
    pub debug: bool,
    /// When used as Fairing, preflights that are answered right away are routed to a route
    /// mounted by the fairing. Specify the base of the route so that it doesn't clash with
    /// any of your existing routes.
    ///
    /// Defaults to `"/cors"`
    pub fairing_route_base: String,
    /// The rank of the route mounted by the fairing.
    ///
    /// Defaults to `0`.
    pub fairing_route_rank: isize,
}

impl Default for CorsSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_origins: Vec::new(),
            allowed_methods: Self::default_allowed_methods(),
            allowed_headers: Vec::new(),
            exposed_headers: Vec::new(),
            allow_credentials: false,
            max_age: 0,
            options_passthrough: false,
            debug: false,
            fairing_route_base: Self::default_fairing_route_base(),
            fairing_route_rank: 0,
        }
    }
}

impl CorsSettings {
    fn default_allowed_methods() -> Vec<String> {
        ["GET", "HEAD", "POST", "OPTIONS", "PUT", "PATCH", "DELETE"]
            .iter()
            .map(|method| (*method).to_string())
            .collect()
    }

    fn default_fairing_route_base() -> String {
        "/cors".to_string()
    }

    /// Normalize the settings into a [`Cors`]
    pub fn to_cors(&self) -> Cors {
        Cors::new(self)
    }

    /// Read the `cors` table of a Rocket configuration.
    ///
    /// A configuration without a `cors` table yields the defaults.
    #[cfg(feature = "serialization")]
    pub fn from_figment(figment: &Figment) -> Result<Self, crate::Error> {
        if !figment.contains(CONFIG_KEY) {
            return Ok(Self::default());
        }
        Ok(figment.extract_inner(CONFIG_KEY)?)
    }
}

/// Build [`Cors`] from Rocket's configuration, logging why it could not be read
#[cfg(feature = "serialization")]
fn load(rocket: &Rocket<Build>) -> Option<Cors> {
    match CorsSettings::from_figment(rocket.figment()) {
        Ok(settings) => Some(settings.to_cors()),
        Err(e) => {
            error!("Error loading CORS configuration: {}", e);
            None
        }
    }
}

/// An ignite fairing that builds [`Cors`] from the `cors` table of Rocket's configuration and
/// attaches it as a fairing.
///
/// Ignition fails if the table cannot be read. Routes using [`Guard`](crate::Guard) need
/// [`config_managed_state`] instead, otherwise their responses would be decorated twice.
///
/// ```rust
/// fn rocket() -> rocket::Rocket<rocket::Build> {
///     rocket::build().attach(rocket_cors_policy::config_fairing())
/// }
/// # fn main() {
/// #     let client = rocket::local::blocking::Client::tracked(rocket()).expect("valid rocket");
/// # }
/// ```
#[cfg(feature = "serialization")]
pub fn config_fairing() -> AdHoc {
    AdHoc::try_on_ignite("CORS Configuration", |rocket| async move {
        match load(&rocket) {
            Some(cors) => Ok(rocket.attach(cors)),
            None => Err(rocket),
        }
    })
}

/// An ignite fairing that builds [`Cors`] from the `cors` table of Rocket's configuration and
/// puts it into managed state for [`Guard`](crate::Guard).
///
/// Ignition fails if the table cannot be read.
///
/// ```rust
/// fn rocket() -> rocket::Rocket<rocket::Build> {
///     rocket::build()
///         .mount("/", rocket_cors_policy::catch_all_options_routes())
///         .attach(rocket_cors_policy::config_managed_state())
/// }
/// # fn main() {
/// #     let client = rocket::local::blocking::Client::tracked(rocket()).expect("valid rocket");
/// # }
/// ```
#[cfg(feature = "serialization")]
pub fn config_managed_state() -> AdHoc {
    AdHoc::try_on_ignite("CORS Managed State", |rocket| async move {
        match load(&rocket) {
            Some(cors) => Ok(rocket.manage(cors)),
            None => Err(rocket),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_restrictive_but_enabled() {
        let settings = CorsSettings::default();

        assert!(settings.enabled);
        assert!(settings.allowed_origins.is_empty());
        assert_eq!(settings.allowed_methods.len(), 7);
        assert!(!settings.allow_credentials);
        assert_eq!(settings.max_age, 0);
        assert_eq!(settings.fairing_route_base, "/cors");

        let cors = settings.to_cors();
        assert!(!cors.policy().is_origin_allowed("https://www.acme.com"));
        assert!(cors.policy().is_method_allowed("PATCH"));
    }

    #[cfg(feature = "serialization")]
    #[test]
    fn partial_json_falls_back_to_defaults() {
        let json = r#"{
  "allowed_origins": ["https://www.acme.com", "https://*.acme.com"],
  "allowed_methods": ["get", "post"],
  "allow_credentials": true,
  "max_age": 42
}"#;
        let settings: CorsSettings = not_err!(serde_json::from_str(json));

        assert!(settings.enabled);
        assert_eq!(settings.allowed_methods, vec!["get", "post"]);
        assert_eq!(settings.max_age, 42);
        assert!(settings.exposed_headers.is_empty());
        assert_eq!(settings.fairing_route_base, "/cors");
    }

    #[cfg(feature = "serialization")]
    #[test]
    fn settings_serialize_as_a_struct() {
        use serde_test::{assert_ser_tokens, Token};

        let settings = CorsSettings {
            allowed_origins: vec!["*".to_string()],
            allowed_methods: vec!["GET".to_string()],
            ..Default::default()
        };

        assert_ser_tokens(
            &settings,
            &[
                Token::Struct {
                    name: "CorsSettings",
                    len: 11,
                },
                Token::Str("enabled"),
                Token::Bool(true),
                Token::Str("allowed_origins"),
                Token::Seq { len: Some(1) },
                Token::Str("*"),
                Token::SeqEnd,
                Token::Str("allowed_methods"),
                Token::Seq { len: Some(1) },
                Token::Str("GET"),
                Token::SeqEnd,
                Token::Str("allowed_headers"),
                Token::Seq { len: Some(0) },
                Token::SeqEnd,
                Token::Str("exposed_headers"),
                Token::Seq { len: Some(0) },
                Token::SeqEnd,
                Token::Str("allow_credentials"),
                Token::Bool(false),
                Token::Str("max_age"),
                Token::I64(0),
                Token::Str("options_passthrough"),
                Token::Bool(false),
                Token::Str("debug"),
                Token::Bool(false),
                Token::Str("fairing_route_base"),
                Token::Str("/cors"),
                Token::Str("fairing_route_rank"),
                Token::I64(0),
                Token::StructEnd,
            ],
        );
    }

    #[cfg(feature = "serialization")]
    #[test]
    fn missing_table_yields_defaults() {
        let figment = Figment::new();
        let settings = not_err!(CorsSettings::from_figment(&figment));
        assert_eq!(settings, CorsSettings::default());
    }

    #[cfg(feature = "serialization")]
    #[test]
    fn table_is_read_from_figment() {
        let figment = Figment::new()
            .merge(("cors.allowed_origins", vec!["https://www.acme.com"]))
            .merge(("cors.options_passthrough", true));
        let settings = not_err!(CorsSettings::from_figment(&figment));

        assert_eq!(settings.allowed_origins, vec!["https://www.acme.com"]);
        assert!(settings.options_passthrough);
        assert!(settings.enabled);
    }

    #[cfg(feature = "serialization")]
    #[test]
    fn malformed_table_is_an_error() {
        let figment = Figment::new().merge(("cors.max_age", "forever"));
        let error = is_err!(CorsSettings::from_figment(&figment));
        assert_matches!(error, crate::Error::Config(_));
    }
}
