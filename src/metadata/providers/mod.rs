//! Concrete metadata provider implementations.

pub mod omdb;

pub use omdb::OmdbProvider;
