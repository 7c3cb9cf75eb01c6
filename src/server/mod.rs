//! HTTP surface: TradingView webhook plus the admin API

pub mod error;
pub mod handlers;
pub mod router;

pub use error::ApiError;
pub use router::{create_router, AppState};
