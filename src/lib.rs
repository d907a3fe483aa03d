//! Configurable report engine for public-procurement ("licitação") process
//! tracking.
//!
//! Data flows from a template or saved definition through the fetcher to a
//! [`types::GeneratedReport`], then through the formatter into the
//! renderer's preview, print and export surfaces. The
//! [`builder::ReportBuilder`] state machine drives the whole flow.

pub mod api;
pub mod builder;
pub mod catalog;
pub mod cli;
pub mod columns;
pub mod config;
pub mod console_format;
pub mod error;
pub mod fetch;
pub mod filter;
pub mod format;
pub mod render;
pub mod store;
pub mod templates;
pub mod types;
pub mod ui;
