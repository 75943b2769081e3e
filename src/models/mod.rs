pub mod artifact;
pub mod registry;

pub use artifact::{ClassifierArtifact, OnnxClassifier};
pub use registry::{ArtifactLoader, ModelRegistry, ModelStats, OnnxLoader};

use crate::utils::error::RiceError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 稻米品种标签（顺序与模型输出一致）
pub const TYPE_LABELS: [&str; 5] = ["Arborio", "Basmati", "Ipsala", "Jasmine", "Karacadag"];

/// 品质等级标签（顺序与模型输出一致）
pub const GRADE_LABELS: [&str; 3] = ["Good", "Average", "Poor"];

/// 分类模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelKind {
    #[serde(rename = "classify-type")]
    Type,
    #[serde(rename = "classify-grade")]
    Grade,
}

impl ModelKind {
    pub const ALL: [ModelKind; 2] = [ModelKind::Type, ModelKind::Grade];

    pub fn labels(self) -> &'static [&'static str] {
        match self {
            ModelKind::Type => &TYPE_LABELS,
            ModelKind::Grade => &GRADE_LABELS,
        }
    }

    /// 默认模型文件名
    pub fn file_name(self) -> &'static str {
        match self {
            ModelKind::Type => "Resnet50.onnx",
            ModelKind::Grade => "rice_grad_resnet50.onnx",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ModelKind::Type => "classify-type",
            ModelKind::Grade => "classify-grade",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ModelKind::Type => "grain type",
            ModelKind::Grade => "quality grade",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelKind {
    type Err = RiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "classify-type" => Ok(ModelKind::Type),
            "classify-grade" => Ok(ModelKind::Grade),
            other => Err(RiceError::InvalidInput(format!(
                "Unknown mode '{}'. Supported modes: classify-type, classify-grade",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modes_parse_from_contract_strings() {
        assert_eq!("classify-type".parse::<ModelKind>().unwrap(), ModelKind::Type);
        assert_eq!(" classify-grade ".parse::<ModelKind>().unwrap(), ModelKind::Grade);
        assert!(matches!(
            "classify-color".parse::<ModelKind>(),
            Err(RiceError::InvalidInput(_))
        ));
    }

    #[test]
    fn serde_uses_contract_strings() {
        let json = serde_json::to_string(&ModelKind::Grade).unwrap();
        assert_eq!(json, "\"classify-grade\"");
        let kind: ModelKind = serde_json::from_str("\"classify-type\"").unwrap();
        assert_eq!(kind, ModelKind::Type);
    }

    #[test]
    fn label_lists_match_model_heads() {
        assert_eq!(ModelKind::Type.labels().len(), 5);
        assert_eq!(ModelKind::Grade.labels(), &["Good", "Average", "Poor"]);
    }
}
