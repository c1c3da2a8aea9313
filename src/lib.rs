pub mod app;
pub mod classify;
pub mod collision;
pub mod config;
pub mod domain;
pub mod error;
pub mod folder;
pub mod fs_util;
pub mod mapping;
pub mod migrate;
pub mod output;
pub mod store;
