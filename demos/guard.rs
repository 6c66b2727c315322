use std::error::Error;

use rocket::{get, options, routes};
use rocket_cors_policy::{CorsSettings, Guard, Responder};

/// Using a `Responder` -- the usual way you would use this
#[get("/")]
fn responder(cors: Guard) -> Responder<&'static str> {
    cors.responder("Hello CORS!")
}

/// Manually mount an OPTIONS route for your own handling
#[options("/manual")]
fn manual_options(cors: Guard) -> Responder<&'static str> {
    cors.responder("Manual OPTIONS preflight handling")
}

/// Manually mount an OPTIONS route for your own handling
#[get("/manual")]
fn manual(cors: Guard) -> Responder<&'static str> {
    cors.responder("Manual OPTIONS preflight handling")
}

/// Merging the guard into a `Response` built by your own `Responder`. You generally won't have
/// to do this.
struct ManualResponse(Guard);

impl<'r> rocket::response::Responder<'r, 'static> for ManualResponse {
    fn respond_to(self, _: &'r rocket::Request<'_>) -> rocket::response::Result<'static> {
        Ok(self.0.response(rocket::Response::new()))
    }
}

#[get("/response")]
fn response(cors: Guard) -> ManualResponse {
    ManualResponse(cors)
}

#[rocket::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // You can also deserialize this
    let cors = CorsSettings {
        allowed_origins: vec![
            "https://www.acme.com".to_string(),
            "https://*.acme.com".to_string(),
        ],
        allowed_methods: vec!["GET".to_string()],
        allowed_headers: vec!["Authorization".to_string(), "Accept".to_string()],
        allow_credentials: true,
        debug: true,
        ..Default::default()
    }
    .to_cors();

    let _ = rocket::build()
        .mount("/", routes![responder, response])
        // Mount the routes to catch all the OPTIONS pre-flight requests
        .mount("/", rocket_cors_policy::catch_all_options_routes())
        // You can also manually mount an OPTIONS route that will be used instead
        .mount("/", routes![manual, manual_options])
        .manage(cors)
        .launch()
        .await?;

    Ok(())
}
