pub mod api;
pub mod cards;
pub mod config;
pub mod db;
pub mod elo;
pub mod formation;
pub mod lobby;
pub mod metrics;
pub mod queue;
pub mod rating;
pub mod sim;
pub mod squad;
