//! Integration test modules

mod audio_test;
mod player_test;
