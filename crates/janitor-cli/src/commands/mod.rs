//! Command implementations.

pub mod check;
pub mod init;
pub mod run;
pub mod show_config;

pub use self::check::execute_check;
pub use self::init::execute_init;
pub use self::run::execute_run;
pub use self::show_config::execute_show_config;
