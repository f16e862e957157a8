pub mod access;
pub mod client;
pub mod grant;
pub mod init;
