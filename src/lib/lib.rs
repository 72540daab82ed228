//! A todo-list service and its terminal client.
//!
//! The service (`adapters::http`) exposes list/create/delete/toggle/update
//! over `/api/todos`, validating input in `core::validation` before anything
//! reaches `storage`. The client (`client`) mirrors the list and re-renders it
//! after every confirmed server response.

pub mod adapters;
pub mod client;
pub mod config;
pub mod core;
pub mod storage;
pub mod transport;
