use crate::image::{ImageLoader, Normalization};
use crate::utils::error::RiceError;
use crate::Result;
use image::imageops::FilterType;
use image::DynamicImage;
use ndarray::{Array4, ArrayView4};

/// 模型输入边长
pub const INPUT_SIZE: usize = 224;
pub const INPUT_CHANNELS: usize = 3;

/// 模型输入张量，形状固定为 [1, 224, 224, 3] (NHWC)
#[derive(Debug, Clone)]
pub struct ImageTensor {
    data: Array4<f32>,
}

impl ImageTensor {
    pub const SHAPE: [usize; 4] = [1, INPUT_SIZE, INPUT_SIZE, INPUT_CHANNELS];

    pub fn from_array(data: Array4<f32>) -> Result<Self> {
        if data.shape() != Self::SHAPE {
            return Err(RiceError::Inference(format!(
                "Expected tensor shape {:?}, got {:?}",
                Self::SHAPE,
                data.shape()
            )));
        }
        Ok(Self { data })
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn view(&self) -> ArrayView4<'_, f32> {
        self.data.view()
    }

    pub fn into_array(self) -> Array4<f32> {
        self.data
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ImagePreprocessor {
    normalization: Normalization,
}

impl ImagePreprocessor {
    pub fn new(normalization: Normalization) -> Self {
        Self { normalization }
    }

    pub fn normalization(&self) -> Normalization {
        self.normalization
    }

    /// 缩放到224x224（不保持宽高比）、转RGB、加batch维度并归一化
    pub fn preprocess(&self, image: &DynamicImage) -> Result<ImageTensor> {
        ImageLoader::validate_dimensions(image)?;

        let size = INPUT_SIZE as u32;
        let rgb = image
            .resize_exact(size, size, FilterType::CatmullRom)
            .to_rgb8();

        let normalization = self.normalization;
        let data = Array4::from_shape_fn(ImageTensor::SHAPE, |(_, h, w, c)| {
            let pixel = rgb.get_pixel(w as u32, h as u32).0;
            normalization.apply(pixel, c)
        });

        ImageTensor::from_array(data)
    }
}
