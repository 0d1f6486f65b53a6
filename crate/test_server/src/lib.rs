pub use server::{KmipTestServer, ServerFault};

mod operations;
mod server;
mod store;
mod symmetric;

#[allow(clippy::unwrap_used, clippy::panic)]
#[cfg(test)]
mod tests;
