//! 基础设施层：持有磁盘等外部资源，只暴露能力

pub mod storage;

pub use storage::{LocalStorage, NameReservation};
