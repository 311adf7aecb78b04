pub mod error;
pub mod item;
pub mod price;

pub use error::{Result, WishlistError};
pub use item::{IdEquality, ItemId, WishlistItem};
pub use price::{resolve_price, sanitize_price};
