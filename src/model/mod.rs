pub mod action;
pub mod amount;
pub mod config;
pub mod pool;
pub mod snapshot;
pub mod stake;

pub use action::Action;
pub use config::OperatorConfig;
pub use pool::{Pool, PoolId};
pub use snapshot::OperatorSnapshot;
pub use stake::{StakeMap, TargetAllocation};
