// src/handlers/mod.rs

pub mod type_the_answer;
