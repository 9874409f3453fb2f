#[macro_use]
extern crate rust_i18n;

pub mod board;
pub mod components;
pub mod config;
pub mod error;
pub mod layout;
#[cfg(feature = "web-interface")]
pub mod server;
pub mod shutdown;
pub mod startup;
pub mod utils;

// Initialize i18n
i18n!("locales", fallback = "en");
