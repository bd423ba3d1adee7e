pub mod auth_handler;
pub mod product_handler;
