#[path = "mod_throttle.rs"]
mod throttle_tests;
