use actix_cors::Cors;
use actix_web::{http::header, middleware::Logger, web::Data, App, HttpServer};
use dotenvy::dotenv;
use log::{error, info, warn};
use reqwest::Client;

mod api;
mod chart;
mod chat;
mod config;
mod dashboard;
mod error;
mod models;
mod normalizer;
mod routes;
mod state;
#[cfg(test)]
mod test_support;

use api::build_client;
use config::AppConfig;
use state::AppState;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config: AppConfig = AppConfig::from_env();

    if config.massive_api_key.is_empty() {
        warn!("MASSIVE_API_KEY is not set, quotes will be synthetic");
    }
    if config.chat_api_key.is_empty() {
        warn!("DEEPSEEK_API_KEY is not set, chat requests will be rejected upstream");
    }

    let client: Client = match build_client(&config) {
        Ok(client) => client,
        Err(err) => {
            error!("Error building HTTP client: {}", err);
            return Err(std::io::Error::new(std::io::ErrorKind::Other, "HTTP client setup failed"));
        }
    };

    let bind = (config.bind.clone(), config.port);
    let state: Data<AppState> = Data::new(AppState::new(config, client));

    tokio::spawn({
        let state = state.clone();
        async move {
            let quotes = state.reload().await;
            info!("Initial load complete with {} quotes", quotes.len());
        }
    });

    info!("Listening on {}:{}", bind.0, bind.1);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST"])
                    .allowed_headers(vec![
                        header::AUTHORIZATION,
                        header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .app_data(state.clone())
            .configure(routes::configure)
    })
    .bind(bind)?
    .run()
    .await
}
