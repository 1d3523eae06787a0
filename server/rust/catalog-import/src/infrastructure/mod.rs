pub mod config;
pub mod csv_reader;
pub mod csv_source;
pub mod database;
pub mod dispatcher;
pub mod logging;
pub mod persistence;
