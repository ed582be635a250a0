pub mod config;
pub mod elements;
pub mod predict;
pub mod predictor;
pub mod web;
