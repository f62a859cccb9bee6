//! # Data Models
//!
//! SeaORM entities for the replicated tables and the per-task sync state.

pub mod aftersale_item;
pub mod aftersale_order;
pub mod order;
pub mod order_item;
pub mod product;
pub mod sync_state;
pub mod user;

pub use aftersale_item::Entity as AftersaleItem;
pub use aftersale_order::Entity as AftersaleOrder;
pub use order::Entity as Order;
pub use order_item::Entity as OrderItem;
pub use product::Entity as Product;
pub use sync_state::Entity as SyncState;
pub use user::Entity as User;
