//! Core types, validation, and limits for the Glimpse capture engine.

pub mod error;
pub mod events;
pub mod funnel;
pub mod limits;
pub mod live;
pub mod pattern;
pub mod sdk;
pub mod session;

pub use error::{
    AuthErrorCode, Error, QueryErrorCode, RateLimitErrorCode, Result, StoreErrorCode,
    ValidationErrorCode,
};
pub use events::*;
pub use funnel::*;
pub use live::*;
pub use pattern::*;
pub use sdk::*;
pub use session::*;
