pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod logs;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod users;

pub use app::build_app;
pub use state::AppState;
