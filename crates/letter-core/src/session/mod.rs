//! Persistence of applicant sessions

pub mod store;

pub use store::SessionStore;
