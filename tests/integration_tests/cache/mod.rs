#[path = "mod_cache.rs"]
mod cache_tests;
#[path = "mod_persistence.rs"]
mod persistence_tests;
