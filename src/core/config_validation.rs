use crate::hardware::camera::config::{FrameSize, PixelFormat, MAX_JPEG_QUALITY};

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    UnknownFrameSize(String),
    UnknownPixelFormat(String),
    InvalidJpegQuality(u8),
    InvalidFrameBufferCount(u8),
    InvalidCaptureInterval(u64),
    InvalidRetryCount(u32),
}

pub fn parse_frame_size(name: &str) -> Result<FrameSize, ValidationError> {
    FrameSize::from_name(name).ok_or_else(|| ValidationError::UnknownFrameSize(name.to_string()))
}

pub fn parse_pixel_format(name: &str) -> Result<PixelFormat, ValidationError> {
    PixelFormat::from_name(name)
        .ok_or_else(|| ValidationError::UnknownPixelFormat(name.to_string()))
}

pub fn validate_jpeg_quality(value: u8) -> Result<u8, ValidationError> {
    if value <= MAX_JPEG_QUALITY {
        Ok(value)
    } else {
        Err(ValidationError::InvalidJpegQuality(value))
    }
}

pub fn validate_fb_count(value: u8) -> Result<u8, ValidationError> {
    if value >= 1 {
        Ok(value)
    } else {
        Err(ValidationError::InvalidFrameBufferCount(value))
    }
}

pub fn validate_capture_interval(seconds: u64) -> Result<u64, ValidationError> {
    if seconds >= 1 {
        Ok(seconds)
    } else {
        Err(ValidationError::InvalidCaptureInterval(seconds))
    }
}

pub fn validate_retry_count(value: u32) -> Result<u32, ValidationError> {
    if (1..=10).contains(&value) {
        Ok(value)
    } else {
        Err(ValidationError::InvalidRetryCount(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_size() {
        assert_eq!(parse_frame_size("QVGA"), Ok(FrameSize::Qvga));
        assert_eq!(parse_frame_size("uxga"), Ok(FrameSize::Uxga));
        assert_eq!(
            parse_frame_size("4K"),
            Err(ValidationError::UnknownFrameSize("4K".to_string()))
        );
    }

    #[test]
    fn test_parse_pixel_format() {
        assert_eq!(parse_pixel_format("JPEG"), Ok(PixelFormat::Jpeg));
        assert_eq!(parse_pixel_format("rgb565"), Ok(PixelFormat::Rgb565));
        assert!(parse_pixel_format("PNG").is_err());
    }

    #[test]
    fn test_jpeg_quality_range() {
        assert_eq!(validate_jpeg_quality(0), Ok(0));
        assert_eq!(validate_jpeg_quality(63), Ok(63));
        assert_eq!(
            validate_jpeg_quality(64),
            Err(ValidationError::InvalidJpegQuality(64))
        );
    }

    #[test]
    fn test_fb_count_must_be_positive() {
        assert_eq!(validate_fb_count(2), Ok(2));
        assert_eq!(
            validate_fb_count(0),
            Err(ValidationError::InvalidFrameBufferCount(0))
        );
    }

    #[test]
    fn test_capture_interval_and_retries() {
        assert!(validate_capture_interval(0).is_err());
        assert_eq!(validate_capture_interval(30), Ok(30));
        assert!(validate_retry_count(0).is_err());
        assert!(validate_retry_count(11).is_err());
        assert_eq!(validate_retry_count(3), Ok(3));
    }
}
