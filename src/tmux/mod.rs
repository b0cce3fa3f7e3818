mod client;

pub use client::TmuxClient;
