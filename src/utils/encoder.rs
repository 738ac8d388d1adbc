/// 画像のbase64エンコード
///
/// 出力バッファは `TieredAllocator` で確保し、エンコーダが報告した
/// 実際の長さで切り詰める（確保容量とは一致しない）。
use base64::{engine::general_purpose::STANDARD, Engine as _};
use log::{debug, error, info};

use crate::hardware::camera::error::{CameraError, CameraResult};
use crate::hardware::memory::{MemoryPools, MemoryTier, TieredAllocator};

/// エンコード済み画像
///
/// バッファの所有権は呼び出し側に移り、ドロップで元のメモリ層へ解放される。
#[derive(Debug)]
pub struct EncodedImage<B> {
    buffer: B,
    len: usize,
    tier: MemoryTier,
}

impl<B: AsRef<[u8]>> EncodedImage<B> {
    /// 有効なエンコード済みバイト列
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer.as_ref()[..self.len]
    }

    /// base64文字列として参照（base64の出力は常にASCII）
    pub fn as_str(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(self.as_bytes())
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// 確保済み容量
    pub fn capacity(&self) -> usize {
        self.buffer.as_ref().len()
    }

    pub fn tier(&self) -> MemoryTier {
        self.tier
    }

    pub fn into_buffer(self) -> B {
        self.buffer
    }
}

/// base64エンコーダ
#[derive(Debug, Clone, Copy)]
pub struct FrameEncoder {
    expansion_factor: f32,
    safety_margin: usize,
}

impl FrameEncoder {
    pub fn new(expansion_factor: f32, safety_margin: usize) -> Self {
        Self {
            expansion_factor,
            safety_margin,
        }
    }

    /// 出力バッファ容量: ceil(入力長 * 膨張率) + 安全マージン
    pub fn output_capacity(&self, input_len: usize) -> usize {
        let expanded = (input_len as f64 * f64::from(self.expansion_factor)).ceil() as usize;
        expanded + self.safety_margin
    }

    /// 生データをbase64にエンコードする
    ///
    /// エンコードに失敗した場合、確保したバッファは解放され
    /// 途中まで書かれたバッファは返さない。
    pub fn encode<M: MemoryPools>(
        &self,
        raw: &[u8],
        allocator: &TieredAllocator<M>,
    ) -> CameraResult<EncodedImage<M::Buffer>> {
        let capacity = self.output_capacity(raw.len());
        let mut allocation = allocator.allocate(capacity)?;

        let output = allocation.buffer.as_mut();
        output.fill(0);

        let len = match STANDARD.encode_slice(raw, output) {
            Ok(len) => len,
            Err(e) => {
                error!(
                    "Base64 encoding failed: {} (input={} bytes, buffer={} bytes)",
                    e,
                    raw.len(),
                    capacity
                );
                return Err(CameraError::EncodingFailed(e.to_string()));
            }
        };

        if raw.is_empty() {
            debug!("空の入力をエンコードしました");
        } else {
            info!(
                "Encoding successful: {} chars ({:.1}% expansion, {})",
                len,
                len as f32 * 100.0 / raw.len() as f32,
                allocation.tier
            );
        }

        Ok(EncodedImage {
            buffer: allocation.buffer,
            len,
            tier: allocation.tier,
        })
    }

    /// base64をデコードする（検証用）
    pub fn decode(encoded: &[u8]) -> CameraResult<Vec<u8>> {
        STANDARD
            .decode(encoded)
            .map_err(|e| CameraError::EncodingFailed(e.to_string()))
    }
}

impl Default for FrameEncoder {
    fn default() -> Self {
        Self::new(1.4, 64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_covers_worst_case_base64_length() {
        let encoder = FrameEncoder::default();
        for len in [0usize, 1, 2, 3, 100, 8192, 70_000] {
            let exact = len.div_ceil(3) * 4;
            assert!(encoder.output_capacity(len) >= exact, "len={}", len);
        }
    }

    #[test]
    fn capacity_uses_factor_and_margin() {
        let encoder = FrameEncoder::new(1.4, 64);
        assert_eq!(encoder.output_capacity(0), 64);
        assert_eq!(encoder.output_capacity(10), 14 + 64);
        assert_eq!(encoder.output_capacity(1), 2 + 64);
    }

    #[test]
    fn decode_rejects_invalid_input() {
        assert!(matches!(
            FrameEncoder::decode(b"@@@@"),
            Err(CameraError::EncodingFailed(_))
        ));
    }
}
