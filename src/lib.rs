//! Admin panel for key-value tables: list rows, select them by primary key,
//! and delete them in bulk.

pub mod chunk;
pub mod config;
pub mod controller;
pub mod domain;
pub mod logging;
pub mod memory_store;
pub mod model;
pub mod record;
pub mod repository;
pub mod store;
pub mod ui;
pub mod view;
