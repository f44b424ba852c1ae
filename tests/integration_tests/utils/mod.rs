// Mirror src/utils plus src/config: logger, devlog and config loading tests here
#[path = "mod_config.rs"]
mod config_tests;
#[path = "mod_devlog.rs"]
mod devlog_tests;
// The only test in the binary that installs a global logger.
#[path = "mod_logger.rs"]
mod logger_tests;
