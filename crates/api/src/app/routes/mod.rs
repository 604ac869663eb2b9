use axum::Router;

pub mod campaigns;
pub mod donations;
pub mod system;

pub fn router() -> Router {
    Router::new()
        .nest("/campaigns", campaigns::router())
        .nest("/donations", donations::router())
}
