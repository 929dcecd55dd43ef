pub mod plugin;
pub mod storage;
pub mod stub;
