// src/models/mod.rs

pub mod draft;
pub mod exam;
pub mod user;
