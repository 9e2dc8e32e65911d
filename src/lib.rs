pub mod camera;
pub mod config;
pub mod pose;
pub mod remote;
pub mod render;
