/// ユーティリティモジュール
pub mod encoder;

pub use encoder::{EncodedImage, FrameEncoder};
