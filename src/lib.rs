pub mod admin;
pub mod app;
pub mod config;
pub mod content;
pub mod db;
pub mod editor;
pub mod graphql;
pub mod loader;
pub mod model;
pub mod notice;
pub mod slug;
