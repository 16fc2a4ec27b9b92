//! Client-side realtime sync engine for the arrboard dashboard.
//!
//! The engine keeps a live ARR projection ticking, merges the chat feed from
//! REST history and broadcast pushes, tracks presence, scrolls the news
//! ticker, runs breaking-news takeovers and drives a shared video session.
//! Everything is headless; `ui` is a terminal front end on top of it.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

pub mod config;
pub mod error;
