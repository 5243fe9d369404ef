pub mod commands;
pub mod handlers;
pub mod routes;
pub mod view;

pub use routes::create_router;
