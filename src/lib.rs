pub mod analytics;
pub mod api;
pub mod app;
pub mod codegen;
pub mod config;
pub mod models;
pub mod redirect;
pub mod service;
pub mod session;
pub mod state;
pub mod storage;
