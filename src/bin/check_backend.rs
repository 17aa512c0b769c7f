#[cfg(feature = "ssr")]
use rugby_predictions::{config::HostConfig, proxy::upstream_url};

#[cfg(feature = "ssr")]
#[tokio::main]
async fn main() {
    let config = HostConfig::from_env();
    let url = upstream_url(&config.backend_url, "hello", None);
    match reqwest::get(&url).await {
        Ok(response) if response.status().is_success() => {
            println!("Backend at {} is online.", config.backend_url);
        }
        Ok(response) => {
            println!(
                "Backend at {} is offline (status {}).",
                config.backend_url,
                response.status()
            );
            std::process::exit(1);
        }
        Err(e) => {
            println!("Backend at {} is offline: {}", config.backend_url, e);
            std::process::exit(1);
        }
    }
}

#[cfg(not(feature = "ssr"))]
fn main() {
    println!("This binary requires the 'ssr' feature to be enabled.");
}
