pub mod shared_pool;
pub mod streamable_pool;

pub use shared_pool::{PlayerEntry, SharedServerResources, SharedWorldPool, VehicleEntry};
pub use streamable_pool::{LabelEntry, ObjectEntry, PickupEntry, StreamableResourcePool};
