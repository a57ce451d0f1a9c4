//! Foodgram - recipe sharing backend
//!
//! Users publish recipes built from ingredients and tags, keep favorites and
//! a shopping cart, follow authors and download an aggregated shopping list.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
