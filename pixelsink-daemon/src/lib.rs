//! pixelsink daemon library: configuration and the terminal simulator
//! device used when no panel hardware is attached.

pub mod config;
pub mod term;
