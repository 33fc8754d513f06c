pub mod activity;
pub mod inventory_item;
pub mod sell_transaction;
pub mod user;
pub mod warehouse;

pub use activity::{ActivityType, Entity as Activity, Model as ActivityModel};
pub use inventory_item::{Entity as InventoryItem, Model as InventoryItemModel};
pub use sell_transaction::{Entity as SellTransaction, Model as SellTransactionModel};
pub use user::{Entity as User, Model as UserModel, UserRole};
pub use warehouse::{Entity as Warehouse, Model as WarehouseModel};
