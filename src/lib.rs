pub mod backend;
pub mod capabilities;
pub mod config;
pub mod error;
pub mod export;
pub mod gallery;
pub mod generator;
pub mod history;
pub mod models;
pub mod renderer;
pub mod routes;
pub mod session;
pub mod share;
pub mod store;
