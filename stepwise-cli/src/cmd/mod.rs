pub mod config;
pub mod run;
pub mod steps;
pub mod validate;
