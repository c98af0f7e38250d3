use actix_web::{get, post, web, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::json;

use crate::api::{fetch_market_status, fetch_stock_details};
use crate::chart::{DetailView, TileView};
use crate::error::ApiError;
use crate::models::Quote;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ChatInput {
    pub content: String,
}

fn tiles(quotes: &[Quote]) -> Vec<TileView> {
    quotes.iter().map(TileView::from_quote).collect()
}

#[get("/")]
async fn index() -> impl Responder {
    HttpResponse::Ok().body("Stock dashboard is running")
}

#[get("/api/quotes")]
async fn get_quotes(state: web::Data<AppState>) -> impl Responder {
    let dashboard = state.dashboard.lock().await;

    HttpResponse::Ok().json(json!({
        "loading": dashboard.is_loading(),
        "stocks": tiles(dashboard.stocks()),
    }))
}

#[post("/api/quotes/reload")]
async fn reload_quotes(state: web::Data<AppState>) -> impl Responder {
    let quotes = state.reload().await;

    HttpResponse::Ok().json(json!({ "loading": false, "stocks": tiles(&quotes) }))
}

#[get("/api/stocks/{ticker}")]
async fn get_stock(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let dashboard = state.dashboard.lock().await;
    let quote = dashboard.quote(&path)?;

    Ok(HttpResponse::Ok().json(DetailView::from_quote(quote)))
}

#[post("/api/stocks/{ticker}/select")]
async fn select_stock(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let mut dashboard = state.dashboard.lock().await;
    let quote = dashboard.select(&path)?;

    Ok(HttpResponse::Ok().json(DetailView::from_quote(quote)))
}

#[get("/api/selected")]
async fn get_selected(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let dashboard = state.dashboard.lock().await;
    let quote = dashboard
        .selected_or_first()
        .ok_or_else(|| ApiError::NotFound("no stocks loaded".to_string()))?;

    Ok(HttpResponse::Ok().json(DetailView::from_quote(quote)))
}

#[get("/api/stocks/{ticker}/details")]
async fn get_stock_details(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let details = fetch_stock_details(&state.client, &state.config, &path).await?;

    Ok(HttpResponse::Ok().json(details))
}

#[get("/api/market-status")]
async fn get_market_status(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let status = fetch_market_status(&state.client, &state.config).await?;

    Ok(HttpResponse::Ok().json(status))
}

#[get("/api/chat")]
async fn get_chat(state: web::Data<AppState>) -> impl Responder {
    let chat = state.chat();

    HttpResponse::Ok().json(json!({ "pending": chat.is_pending(), "messages": chat.messages() }))
}

#[post("/api/chat")]
async fn post_chat(state: web::Data<AppState>, input: web::Json<ChatInput>) -> Result<HttpResponse, ApiError> {
    let reply = state.ask(&input.content).await?;

    Ok(HttpResponse::Ok().json(reply))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(index)
        .service(get_quotes)
        .service(reload_quotes)
        .service(get_selected)
        .service(get_market_status)
        .service(get_stock_details)
        .service(select_stock)
        .service(get_stock)
        .service(get_chat)
        .service(post_chat);
}
