pub mod guard;
pub mod local;
pub mod middleware;
pub mod password;
pub mod provider;
pub mod reset;
pub mod session;
