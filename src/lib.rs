//! News Feed - A news aggregator for RSS feeds and Reddit
//!
//! This crate fetches several upstream sources concurrently, normalizes
//! them into one item shape, deduplicates by link and serves the merged,
//! newest-first feed over a small JSON API.

pub mod aggregator;
pub mod cache;
pub mod config;
pub mod item;
pub mod reddit;
pub mod routes;
pub mod rss;
pub mod source;
