const SECRETS: [&str; 4] = ["WIFI_SSID", "WIFI_PASSWORD", "TELEMETRY_HOST", "TELEMETRY_PORT"];

fn main() {
    // A missing .env is fine as long as the variables come from the environment
    let _ = dotenvy::dotenv();
    println!("cargo:rerun-if-changed=.env");

    for key in SECRETS {
        println!("cargo:rerun-if-env-changed={key}");
        let value = std::env::var(key).unwrap_or_default();
        if value.is_empty() && key.starts_with("WIFI") {
            println!("cargo:warning={key} is not set, Wi-Fi will not associate");
        }
        println!("cargo:rustc-env={key}={value}");
    }

    println!("cargo:rustc-link-arg=-Tlinkall.x");
}
