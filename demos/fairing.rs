use std::error::Error;

use rocket::{get, routes};
use rocket_cors_policy::CorsSettings;

#[get("/")]
fn cors() -> &'static str {
    "Hello CORS"
}

#[rocket::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // You can also deserialize this, or attach `rocket_cors_policy::config_fairing()` to read
    // the `cors` table of `Rocket.toml`
    let cors = CorsSettings {
        allowed_origins: vec!["https://www.acme.com".to_string()],
        allowed_methods: vec!["GET".to_string()],
        allowed_headers: vec!["Authorization".to_string(), "Accept".to_string()],
        allow_credentials: true,
        max_age: 3600,
        ..Default::default()
    }
    .to_cors();

    let _ = rocket::build()
        .mount("/", routes![cors])
        .attach(cors)
        .launch()
        .await?;

    Ok(())
}
