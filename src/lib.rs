//! Interactive orthographic globe for the terminal.

pub mod braille;
pub mod config;
pub mod data;
pub mod geo;
pub mod globe;
pub mod logging;
