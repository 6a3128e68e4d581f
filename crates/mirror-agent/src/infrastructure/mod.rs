//! Infrastructure layer for the agent.
//!
//! Contains the configuration file loader and the in-process implementations
//! of the device capabilities consumed by the session controller.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `mirror_core`, but MUST NOT be imported by the `application` layer.

pub mod config;
pub mod input_injection;
pub mod services;
