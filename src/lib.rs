pub mod audit;
pub mod config;
pub mod db;
pub mod draft;
pub mod dto;
pub mod entity;
pub mod error;
pub mod geo;
pub mod middleware;
pub mod models;
pub mod realtime;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;
