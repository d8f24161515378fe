//! Mainblog - A small multi-author blog with moderated accounts
//!
//! This library provides accounts with profiles and timed bans, articles
//! with adult-content gating, and owner-scoped comments, served over a JSON API.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
