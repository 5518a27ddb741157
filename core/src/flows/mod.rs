// seatbook/src/flows/mod.rs

//! The two payment paths, each assembled as a `Flow` of named steps.

pub mod common_steps;
pub mod contexts;
pub mod gateway_flow;
pub mod manual_flow;

pub use contexts::{BookingCtx, BookingDraft, BookingRequest, GatewayCtxData, ManualCtxData};
pub use gateway_flow::gateway_booking_flow;
pub use manual_flow::manual_booking_flow;
