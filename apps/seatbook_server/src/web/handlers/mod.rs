// apps/seatbook_server/src/web/handlers/mod.rs

pub mod admin_handlers;
pub mod callback_handlers;
pub mod checkout_handlers;
pub mod order_handlers;
