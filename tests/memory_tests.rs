use esp32cam_capture::hardware::camera::CameraError;
use esp32cam_capture::hardware::mock::MockMemory;
use esp32cam_capture::hardware::{MemoryTier, TieredAllocator};
use esp32cam_capture::FrameEncoder;

const THRESHOLD: usize = 8192;

#[test]
fn test_small_requests_never_touch_psram() {
    let memory = MockMemory::default();
    let allocator = TieredAllocator::new(memory.clone(), THRESHOLD);

    assert_eq!(allocator.allocate(100).unwrap().tier, MemoryTier::Fast);
    assert_eq!(allocator.allocate(THRESHOLD).unwrap().tier, MemoryTier::Fast);

    assert!(!memory.touched(MemoryTier::Slow));
}

#[test]
fn test_large_requests_prefer_psram() {
    let memory = MockMemory::default();
    let allocator = TieredAllocator::new(memory.clone(), THRESHOLD);

    let allocation = allocator.allocate(THRESHOLD + 1).unwrap();

    assert_eq!(allocation.tier, MemoryTier::Slow);
    assert_eq!(allocation.buffer.len(), THRESHOLD + 1);
    assert_eq!(memory.attempts(), vec![(MemoryTier::Slow, THRESHOLD + 1)]);
}

#[test]
fn test_large_requests_fall_back_when_psram_exhausted() {
    let memory = MockMemory::new(64 * 1024, Some(1024));
    let allocator = TieredAllocator::new(memory.clone(), THRESHOLD);

    let allocation = allocator.allocate(10_000).unwrap();

    assert_eq!(allocation.tier, MemoryTier::Fast);
    assert_eq!(
        memory.attempts(),
        vec![(MemoryTier::Slow, 10_000), (MemoryTier::Fast, 10_000)]
    );
}

#[test]
fn test_without_psram_large_requests_use_dram() {
    let memory = MockMemory::without_psram(64 * 1024);
    let allocator = TieredAllocator::new(memory.clone(), THRESHOLD);

    assert_eq!(allocator.allocate(20_000).unwrap().tier, MemoryTier::Fast);
    assert!(!memory.touched(MemoryTier::Slow));
}

#[test]
fn test_exhausted_only_when_both_tiers_fail() {
    let memory = MockMemory::new(1024, Some(2048));
    let allocator = TieredAllocator::new(memory, THRESHOLD);

    assert!(matches!(
        allocator.allocate(50_000),
        Err(CameraError::ResourceExhausted { requested: 50_000 })
    ));
}

#[test]
fn test_encode_round_trip() {
    let allocator = TieredAllocator::new(MockMemory::default(), THRESHOLD);
    let encoder = FrameEncoder::default();

    let large: Vec<u8> = (0..70_000u32).map(|i| (i % 251) as u8).collect();
    for input in [Vec::new(), vec![0x42], large] {
        let image = encoder.encode(&input, &allocator).unwrap();
        assert!(image.len() <= image.capacity());
        assert_eq!(FrameEncoder::decode(image.as_bytes()).unwrap(), input);
    }
}

#[test]
fn test_encoded_output_is_standard_padded_base64() {
    let allocator = TieredAllocator::new(MockMemory::default(), THRESHOLD);
    let image = FrameEncoder::default().encode(b"ab", &allocator).unwrap();

    assert_eq!(image.as_str().unwrap(), "YWI=");
    assert_eq!(image.len(), 4);
    assert_eq!(image.capacity(), 3 + 64);
    // 有効長より後ろはゼロ埋め
    assert!(image.into_buffer()[4..].iter().all(|b| *b == 0));
}

#[test]
fn test_encode_fails_when_buffer_too_small() {
    let allocator = TieredAllocator::new(MockMemory::default(), THRESHOLD);
    let encoder = FrameEncoder::new(1.0, 0);

    assert!(matches!(
        encoder.encode(b"abc", &allocator),
        Err(CameraError::EncodingFailed(_))
    ));
}
