//! This example is to demonstrate the JSON serialization and deserialization of the Cors settings
//!
//! Note: This requires the `serialization` feature which is enabled by default.
use rocket_cors_policy::CorsSettings;

fn main() {
    let default = CorsSettings::default();

    let settings = CorsSettings {
        allowed_origins: vec![
            "https://www.acme.com".to_string(),
            "https://*.acme.com".to_string(),
        ],
        allowed_methods: vec!["GET".to_string(), "POST".to_string(), "DELETE".to_string()],
        allowed_headers: vec!["Authorization".to_string(), "Accept".to_string()],
        exposed_headers: vec!["Content-Type".to_string(), "X-Custom".to_string()],
        allow_credentials: true,
        max_age: 42,
        fairing_route_base: "/mycors".to_string(),
        ..Default::default()
    };

    println!("Default settings");
    println!("{}", serde_json::to_string_pretty(&default).unwrap());

    println!("Defined settings");
    let json = serde_json::to_string_pretty(&settings).unwrap();
    println!("{}", json);

    // Every field is optional
    let partial: CorsSettings =
        serde_json::from_str(r#"{"allowed_origins": ["*"], "debug": true}"#).unwrap();
    println!("Partial settings");
    println!("{:#?}", partial);
}
