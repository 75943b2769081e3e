use crate::utils::error::RiceError;
use crate::Result;
use base64::Engine;
use image::{DynamicImage, GenericImageView, ImageFormat};

/// 默认上传大小上限
pub const DEFAULT_MAX_IMAGE_SIZE: usize = 20 * 1024 * 1024;

#[derive(Debug, Clone, Copy)]
pub struct ImageLoader {
    max_size: usize,
}

impl Default for ImageLoader {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_IMAGE_SIZE)
    }
}

impl ImageLoader {
    pub fn new(max_size: usize) -> Self {
        Self { max_size }
    }

    /// 从base64字符串加载图像
    pub fn from_base64(&self, base64_data: &str) -> Result<DynamicImage> {
        // 移除可能的数据URL前缀 (data:image/xxx;base64,)
        let base64_clean = match base64_data.trim() {
            data if data.starts_with("data:") => data
                .split_once(',')
                .map(|(_, payload)| payload)
                .ok_or_else(|| RiceError::InvalidInput("Malformed data URL".to_string()))?,
            data => data,
        };

        let image_bytes = base64::engine::general_purpose::STANDARD.decode(base64_clean)?;

        self.from_bytes(&image_bytes)
    }

    /// 从字节流加载图像
    pub fn from_bytes(&self, bytes: &[u8]) -> Result<DynamicImage> {
        if bytes.is_empty() {
            return Err(RiceError::InvalidInput("Empty image data".to_string()));
        }

        if bytes.len() > self.max_size {
            return Err(RiceError::FileTooLarge(format!(
                "{} bytes, max allowed: {} bytes",
                bytes.len(),
                self.max_size
            )));
        }

        let format = Self::detect_format(bytes).ok_or_else(|| {
            RiceError::UnsupportedImage("Unrecognized image format".to_string())
        })?;

        if !Self::is_supported_format(format) {
            return Err(RiceError::UnsupportedImage(format!(
                "{:?} images are not supported, upload a JPEG or PNG",
                format
            )));
        }

        let image = image::load_from_memory_with_format(bytes, format)?;
        Self::validate_dimensions(&image)?;

        tracing::debug!(
            "Decoded {:?} image: {}x{}",
            format,
            image.width(),
            image.height()
        );

        Ok(image)
    }

    /// 检测图像格式
    pub fn detect_format(bytes: &[u8]) -> Option<ImageFormat> {
        image::guess_format(bytes).ok()
    }

    /// 验证图像格式是否支持
    pub fn is_supported_format(format: ImageFormat) -> bool {
        matches!(format, ImageFormat::Png | ImageFormat::Jpeg)
    }

    /// 验证图像尺寸
    pub fn validate_dimensions(image: &DynamicImage) -> Result<()> {
        let (width, height) = image.dimensions();

        if width == 0 || height == 0 {
            return Err(RiceError::UnsupportedImage(format!(
                "Image has zero dimensions: {}x{}",
                width, height
            )));
        }

        Ok(())
    }
}
