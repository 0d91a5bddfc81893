mod order;
mod trade;
pub mod token;
mod user;
mod wallet;

pub use order::{Order, OrderError, OrderKind, OrderStatus, PlaceOrderRequest, Side};
pub use token::RefreshToken;
pub use trade::Trade;
pub use user::{User, UserError};
pub use wallet::{Wallet, WalletError};
