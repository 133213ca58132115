//! Todo-list client library: a task API client, optimistic task state,
//! session persistence and form validation.

pub mod api;
pub mod auth;
pub mod config;
pub mod forms;
pub mod tasks;
pub mod view;
