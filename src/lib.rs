pub mod config;
pub mod drive;
pub mod error;
pub mod photos;
pub mod qr;
pub mod session;
pub mod web;
pub mod tasks {
    pub mod fetcher;
    pub mod rotator;
}

pub use error::Error;
