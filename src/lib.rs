// src/lib.rs

//! market-feed library
//!
//! Tracks marketplace search results across runs and republishes each
//! tracked query as an RSS feed.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
