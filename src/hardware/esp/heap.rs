/// ESP-IDF のヒープ（内部DRAM / PSRAM）による `MemoryPools` 実装
use std::ptr::NonNull;

use esp_idf_sys::{
    heap_caps_free, heap_caps_get_free_size, heap_caps_get_total_size, heap_caps_malloc,
    MALLOC_CAP_8BIT, MALLOC_CAP_SPIRAM,
};

use crate::hardware::memory::{MemoryPools, MemoryTier};

fn caps(tier: MemoryTier) -> u32 {
    match tier {
        MemoryTier::Fast => MALLOC_CAP_8BIT,
        MemoryTier::Slow => MALLOC_CAP_SPIRAM,
    }
}

/// `heap_caps_malloc` で確保したバッファ。ドロップで `heap_caps_free`
pub struct HeapCapsBuffer {
    ptr: NonNull<u8>,
    len: usize,
}

// 確保したメモリはこのバッファだけが所有する
unsafe impl Send for HeapCapsBuffer {}

impl AsRef<[u8]> for HeapCapsBuffer {
    fn as_ref(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl AsMut<[u8]> for HeapCapsBuffer {
    fn as_mut(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl Drop for HeapCapsBuffer {
    fn drop(&mut self) {
        unsafe { heap_caps_free(self.ptr.as_ptr().cast()) };
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct HeapCapsPools;

impl MemoryPools for HeapCapsPools {
    type Buffer = HeapCapsBuffer;

    fn allocate(&self, tier: MemoryTier, size: usize) -> Option<HeapCapsBuffer> {
        // 0バイト確保はNULLを返し得るため最低1バイト確保する
        let ptr = unsafe { heap_caps_malloc(size.max(1), caps(tier)) };
        let ptr = NonNull::new(ptr.cast::<u8>())?;
        let mut buffer = HeapCapsBuffer { ptr, len: size };
        buffer.as_mut().fill(0);
        Some(buffer)
    }

    fn free_size(&self, tier: MemoryTier) -> usize {
        unsafe { heap_caps_get_free_size(caps(tier)) }
    }

    fn is_available(&self, tier: MemoryTier) -> bool {
        match tier {
            MemoryTier::Fast => true,
            MemoryTier::Slow => unsafe { heap_caps_get_total_size(MALLOC_CAP_SPIRAM) } > 0,
        }
    }
}
