//! Orders and delivery addresses.

mod address;
mod order;

pub use address::{validate_all, Address};
pub use order::{
    Order, OrderItem, OrderLine, OrderService, OrderSettings, OrderStatus, PaymentMethod,
    PaymentStatus, PlaceOrder, StatusUpdate,
};
