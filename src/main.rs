mod app;
mod auth;
mod config;
mod db;
mod error;
mod routes;
mod routing;
mod state;

#[cfg(test)]
mod testing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "shop_api=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    // `shop-api hash-password <plain>` prints a PHC string for seeding `users`.
    let mut args = std::env::args().skip(1);
    if args.next().as_deref() == Some("hash-password") {
        let plain = args
            .next()
            .ok_or_else(|| anyhow::anyhow!("usage: shop-api hash-password <password>"))?;
        println!("{}", auth::password::hash_password(&plain)?);
        return Ok(());
    }

    let app_state = state::AppState::init()?;
    tracing::info!(routes = app_state.routes.routes().len(), "route table ready");

    let config = app_state.config.clone();
    app::serve(app::build_app(app_state), &config).await
}
