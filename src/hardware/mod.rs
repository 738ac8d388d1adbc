/// ハードウェア制御モジュール
pub mod camera;
pub mod memory;
pub mod pins;

#[cfg(feature = "esp")]
pub mod esp;
#[cfg(not(feature = "esp"))]
pub mod mock;

pub use memory::{MemoryPools, MemoryTier, TieredAllocator};
pub use pins::CameraPins;
