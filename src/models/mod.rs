// src/models/mod.rs

pub mod game;
pub mod game_form;
pub mod question;
pub mod response;
pub mod result;
pub mod user;
