pub mod browser;
pub mod components;
pub mod event;
pub mod screens;
