//! Forum feed service library.
//!
//! Builds the structured home feed of a discussion forum: topics are drawn
//! from time/popularity segments in fixed proportions, deduplicated in
//! priority order, and served one page at a time over HTTP.

pub mod config;
pub mod db;
pub mod feed;
pub mod web;
