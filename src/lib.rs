//! Interactive world bubble map for the terminal: country outlines and
//! per-country circles sized by a metric, with zoom, hover and a size legend.

pub mod app;
pub mod braille;
pub mod config;
pub mod data;
pub mod error;
pub mod legend;
pub mod map;
pub mod ui;

#[cfg(test)]
mod test_support;
