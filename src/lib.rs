pub mod app;
pub mod auth;

pub use app::create_app;
