pub mod games_index;
pub mod scoring;
pub mod type_the_answer;
