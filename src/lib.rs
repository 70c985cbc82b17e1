//! newsdesk: personalized news backend
//!
//! Users register with topical interests, pull articles from an external
//! news provider filtered by those interests, save articles with tags, and
//! get extractive summaries with a sentiment label for what they saved.
//!
//! Storage is a Sled document store; the HTTP surface is Axum.

pub mod accounts;
pub mod articles;
pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod news;
// REST API module: Axum router, bearer middleware and handlers
pub mod rest;
pub mod storage;
pub mod summarize;
