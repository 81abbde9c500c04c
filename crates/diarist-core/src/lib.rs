pub mod api;
pub mod bootstrap;
pub mod capture;
pub mod collection;
pub mod config;
pub mod error;
pub mod model;
pub mod nav;
pub mod view;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;
