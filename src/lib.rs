//! Roomsense - office environmental monitoring backend
//!
//! This library provides the core of the roomsense service: device-authenticated
//! sensor ingestion, reading storage, debounced humidity alerting, and the
//! dashboard/auth API.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
