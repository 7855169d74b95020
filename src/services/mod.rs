// src/services/mod.rs

pub mod drafts;
pub mod exam_service;
