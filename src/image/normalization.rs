use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Caffe风格的ImageNet通道均值（BGR顺序）
const CAFFE_MEAN_BGR: [f32; 3] = [103.939, 116.779, 123.68];

/// Torch风格的ImageNet均值和标准差（RGB顺序）
const TORCH_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const TORCH_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// 模型期望的输入归一化方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Normalization {
    /// RGB转BGR后减去通道均值，不缩放（Keras ResNet50）
    #[default]
    Caffe,
    /// 保持0-255原值（模型内部自带归一化，例如Keras EfficientNet）
    Passthrough,
    /// 缩放到[0,1]后按均值和标准差标准化
    Torch,
}

impl Normalization {
    /// 计算输出通道 `channel` 的值，`rgb` 为原始像素
    #[inline]
    pub fn apply(self, rgb: [u8; 3], channel: usize) -> f32 {
        match self {
            Normalization::Caffe => rgb[2 - channel] as f32 - CAFFE_MEAN_BGR[channel],
            Normalization::Passthrough => rgb[channel] as f32,
            Normalization::Torch => {
                (rgb[channel] as f32 / 255.0 - TORCH_MEAN[channel]) / TORCH_STD[channel]
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Normalization::Caffe => "caffe",
            Normalization::Passthrough => "passthrough",
            Normalization::Torch => "torch",
        }
    }
}
