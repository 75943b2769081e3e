use crate::models::ModelKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 分类结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// 预测标签
    pub label: String,
    /// 置信度 (0.0 - 100.0)
    pub confidence: f32,
}

impl fmt::Display for PredictionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:.2}%)", self.label, self.confidence)
    }
}

/// 带上下文的完整分类报告
#[derive(Debug, Clone, Serialize)]
pub struct ClassificationReport {
    pub mode: ModelKind,
    #[serde(flatten)]
    pub prediction: PredictionResult,
    /// 处理耗时（秒）
    pub processing_time: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_two_decimals() {
        let result = PredictionResult {
            label: "Jasmine".to_string(),
            confidence: 87.456,
        };
        assert_eq!(result.to_string(), "Jasmine (87.46%)");
    }

    #[test]
    fn report_flattens_prediction() {
        let report = ClassificationReport {
            mode: ModelKind::Grade,
            prediction: PredictionResult {
                label: "Good".to_string(),
                confidence: 50.0,
            },
            processing_time: 0.25,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["mode"], "classify-grade");
        assert_eq!(json["label"], "Good");
        assert_eq!(json["confidence"], 50.0);
    }
}
