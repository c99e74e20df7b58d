pub mod catalog;
pub mod downloads;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod scripts;
pub mod subscriptions;

pub use routes::create_router;
