mod auth;
mod orders;
mod trades;
mod wallets;

pub use auth::auth_routes;
pub use orders::order_routes;
pub use trades::trade_routes;
pub use wallets::wallet_routes;
