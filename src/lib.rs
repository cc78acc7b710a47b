pub mod clock;
pub mod config;
pub mod constants;
pub mod export;
pub mod logging;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;
pub mod workers;
