// Core infrastructure modules
pub mod config;
pub mod core;

// Feature-specific modules
pub mod command_palette;
pub mod form;
pub mod records;
pub mod repl;
pub mod results_grid;

#[cfg(test)]
mod test_utils;
