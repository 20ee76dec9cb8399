use forecast_tool::{Schedule, http_api};
use std::net::SocketAddr;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let addr: SocketAddr = std::env::var("FORECAST_HTTP_ADDR")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 8080)));

    let schedule = Schedule::new();
    println!("forecast-tool http api listening on {addr}");
    http_api::serve(addr, schedule).await
}
