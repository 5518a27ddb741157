// apps/seatbook_server/src/services/mod.rs

pub mod gateway_client;
pub mod proof_storage;
pub mod workbook;
