// Handlers module - gateway endpoint handlers

pub mod auth;
pub mod export;
pub mod passthrough;
pub mod resource;
