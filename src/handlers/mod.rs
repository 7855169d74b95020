// src/handlers/mod.rs

pub mod auth;
pub mod drafts;
pub mod exams;
pub mod pattern;
