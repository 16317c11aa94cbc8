//! Data models for Bookrent

pub mod book;
pub mod cache;
pub mod rental;
pub mod user;

// Re-export commonly used types
pub use book::{Book, BookMetadata, CreateBook, NewBook, UpdateBook};
pub use cache::CacheEntry;
pub use rental::{NewRental, Rental, RentalWithBook, ReturnCode};
pub use user::{NewUser, Role, User, UserClaims, UserInfo};
