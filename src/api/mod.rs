pub mod response;
pub mod server;
pub mod stdio;
pub mod tools;
