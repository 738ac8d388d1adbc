/// メモリ層の選択
///
/// 画像バッファは内部DRAMに対して大きいため、PSRAMがあれば大きな確保は
/// PSRAMを優先し、内部DRAMの断片化を避ける。小さな確保はアクセスの速い
/// 内部DRAMに置く。
use log::{debug, warn};

use crate::hardware::camera::error::{CameraError, CameraResult};

/// メモリ層
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryTier {
    /// 内部DRAM（小容量・高速）
    Fast,
    /// PSRAM（大容量・低速）
    Slow,
}

impl std::fmt::Display for MemoryTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemoryTier::Fast => write!(f, "DRAM"),
            MemoryTier::Slow => write!(f, "PSRAM"),
        }
    }
}

/// メモリプールの抽象化
pub trait MemoryPools: Send + Sync {
    /// 確保したバッファ。ドロップで解放される
    type Buffer: AsRef<[u8]> + AsMut<[u8]> + Send;

    fn allocate(&self, tier: MemoryTier, size: usize) -> Option<Self::Buffer>;

    fn free_size(&self, tier: MemoryTier) -> usize;

    /// その層がシステムに存在するか
    fn is_available(&self, tier: MemoryTier) -> bool;
}

/// 確保結果（バッファと使用した層）
#[derive(Debug)]
pub struct Allocation<B> {
    pub buffer: B,
    pub tier: MemoryTier,
}

/// 2層アロケータ
pub struct TieredAllocator<M: MemoryPools> {
    pools: M,
    slow_threshold: usize,
}

impl<M: MemoryPools> TieredAllocator<M> {
    pub fn new(pools: M, slow_threshold: usize) -> Self {
        Self {
            pools,
            slow_threshold,
        }
    }

    pub fn pools(&self) -> &M {
        &self.pools
    }

    /// サイズに応じた層でバッファを確保する
    ///
    /// PSRAMが存在し、かつ閾値を超える場合のみPSRAMを先に試す。
    /// 両方失敗した場合だけ `ResourceExhausted` を返す。
    pub fn allocate(&self, size: usize) -> CameraResult<Allocation<M::Buffer>> {
        if self.pools.is_available(MemoryTier::Slow) && size > self.slow_threshold {
            if let Some(buffer) = self.pools.allocate(MemoryTier::Slow, size) {
                debug!("Allocated {} bytes in {}", size, MemoryTier::Slow);
                return Ok(Allocation {
                    buffer,
                    tier: MemoryTier::Slow,
                });
            }
            warn!("PSRAM allocation failed ({} bytes), trying DRAM", size);
        }

        match self.pools.allocate(MemoryTier::Fast, size) {
            Some(buffer) => {
                debug!("Allocated {} bytes in {}", size, MemoryTier::Fast);
                Ok(Allocation {
                    buffer,
                    tier: MemoryTier::Fast,
                })
            }
            None => {
                warn!(
                    "メモリ確保失敗: {} bytes (空き DRAM={}, PSRAM={})",
                    size,
                    self.pools.free_size(MemoryTier::Fast),
                    self.pools.free_size(MemoryTier::Slow)
                );
                Err(CameraError::ResourceExhausted { requested: size })
            }
        }
    }
}
