/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/

//! # MDict Engine
//!
//! The dictionary manager and its collaborator interfaces.
//!
//! This crate provides:
//! - **DictionaryManager**: Single-threaded reactor coalescing and fanning out dictionary fetches
//! - **UpstreamGateway trait**: Interface for sending INFO and FULL requests upstream
//! - **DictionaryConsumer trait**: Callback interface for response and completion consumers
//! - **Builder API**: Fluent configuration for manager setup

pub mod application;
pub mod builder;
pub mod gateway;
pub mod manager;

pub use application::{DictionaryConsumer, NoOpConsumer};
pub use builder::ManagerBuilder;
pub use gateway::{UpstreamEvent, UpstreamGateway};
pub use manager::DictionaryManager;
