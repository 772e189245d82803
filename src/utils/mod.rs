// src/utils/mod.rs

pub mod csv_sync;
pub mod form;
pub mod html;
pub mod jwt;
pub mod storage;
