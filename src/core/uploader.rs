/// 画像の引き渡し先
///
/// 撮影した画像（base64文字列）をどこへ送るかを抽象化します。
/// 実機ではシリアルコンソールへストリーミングします。
use std::io::Write;

use log::debug;

/// 引き渡しのエラー
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("画像の書き込みに失敗しました: {0}")]
    Io(#[from] std::io::Error),
    #[error("画像データが空です")]
    EmptyImage,
}

/// 画像の引き渡し先
pub trait ImageUploader {
    fn upload(&mut self, image: &str, timestamp: &str) -> Result<(), UploadError>;
}

/// バイトストリームへ画像を書き出す
///
/// 形式: `IMAGE <timestamp> <len>\n<base64>\nEND\n`
pub struct StreamUploader<W: Write> {
    sink: W,
}

impl<W: Write> StreamUploader<W> {
    pub fn new(sink: W) -> Self {
        Self { sink }
    }

    pub fn sink(&self) -> &W {
        &self.sink
    }

    pub fn into_inner(self) -> W {
        self.sink
    }
}

impl<W: Write> ImageUploader for StreamUploader<W> {
    fn upload(&mut self, image: &str, timestamp: &str) -> Result<(), UploadError> {
        if image.is_empty() {
            return Err(UploadError::EmptyImage);
        }

        writeln!(self.sink, "IMAGE {} {}", timestamp, image.len())?;
        self.sink.write_all(image.as_bytes())?;
        self.sink.write_all(b"\nEND\n")?;
        self.sink.flush()?;

        debug!("Streamed {} bytes (timestamp {})", image.len(), timestamp);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_format() {
        let mut uploader = StreamUploader::new(Vec::new());
        uploader.upload("QUJD", "20250101_120000").unwrap();
        let written = String::from_utf8(uploader.into_inner()).unwrap();
        assert_eq!(written, "IMAGE 20250101_120000 4\nQUJD\nEND\n");
    }

    #[test]
    fn test_empty_image_is_rejected() {
        let mut uploader = StreamUploader::new(Vec::new());
        assert!(matches!(
            uploader.upload("", "20250101_120000"),
            Err(UploadError::EmptyImage)
        ));
        assert!(uploader.sink().is_empty());
    }
}
