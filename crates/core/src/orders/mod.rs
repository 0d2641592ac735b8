//! Orders module - canonical orders, their lifecycle rules and repository contract.

mod orders_model;
mod orders_traits;

pub use orders_model::{
    Escrow, EscrowStatus, NewOrder, Order, OrderLine, OrderStatus, OrderUpdate, Party,
    PaymentStatus,
};
pub use orders_traits::OrderRepositoryTrait;
