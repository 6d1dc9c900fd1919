pub mod auth_cmd;
pub mod cache;
pub mod common;
pub mod messages;
pub mod publish;
pub mod show;
pub mod sync;
pub mod watch;
