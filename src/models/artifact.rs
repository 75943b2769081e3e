use crate::config::OnnxConfig;
use crate::image::ImageTensor;
use crate::utils::error::RiceError;
use crate::Result;
use ort::{
    inputs,
    session::{builder::GraphOptimizationLevel, Session},
    value::Tensor,
};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};

/// 已训练的分类模型，只暴露预测能力
pub trait ClassifierArtifact: Send + Sync {
    /// 对单张图像张量推理，返回各类别概率
    fn predict(&self, tensor: ImageTensor) -> Result<Vec<f32>>;

    fn name(&self) -> &str;
}

/// 基于ONNX Runtime的分类模型
pub struct OnnxClassifier {
    // Session::run 需要独占访问
    session: Mutex<Session>,
    name: String,
    path: PathBuf,
    input_name: String,
    output_name: String,
}

impl OnnxClassifier {
    pub fn load(model_path: &Path, onnx_config: &OnnxConfig) -> Result<Self> {
        if !model_path.exists() {
            return Err(RiceError::ModelLoad(format!(
                "Model not found: {}",
                model_path.display()
            )));
        }

        tracing::info!("Loading classification model from: {}", model_path.display());

        let session = Session::builder()
            .map_err(|e| load_error(model_path, e))?
            .with_optimization_level(optimization_level(onnx_config.optimization_level))
            .map_err(|e| load_error(model_path, e))?
            .with_intra_threads(onnx_config.intra_threads)
            .map_err(|e| load_error(model_path, e))?
            .commit_from_file(model_path)
            .map_err(|e| load_error(model_path, e))?;

        // 动态发现输入输出名称
        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .ok_or_else(|| RiceError::ModelLoad("Model has no inputs".to_string()))?;

        let output_name = session
            .outputs
            .first()
            .map(|output| output.name.clone())
            .ok_or_else(|| RiceError::ModelLoad("Model has no outputs".to_string()))?;

        for (i, output) in session.outputs.iter().enumerate() {
            tracing::debug!("Model output[{}]: '{}'", i, output.name);
        }

        let name = model_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| model_path.display().to_string());

        tracing::info!(
            "Model '{}' ready: input='{}', output='{}'",
            name,
            input_name,
            output_name
        );

        Ok(Self {
            session: Mutex::new(session),
            name,
            path: model_path.to_path_buf(),
            input_name,
            output_name,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ClassifierArtifact for OnnxClassifier {
    fn predict(&self, tensor: ImageTensor) -> Result<Vec<f32>> {
        let input_tensor = Tensor::from_array(tensor.into_array())
            .map_err(|e| RiceError::Inference(format!("Failed to build input tensor: {}", e)))?;

        let mut session = self.session.lock();
        let outputs = session
            .run(inputs![self.input_name.as_str() => input_tensor])
            .map_err(|e| RiceError::Inference(format!("{}: {}", self.name, e)))?;

        let output = match outputs.get(self.output_name.as_str()) {
            Some(output) => output,
            None => {
                let available_outputs: Vec<String> =
                    outputs.keys().map(|s| s.to_string()).collect();
                return Err(RiceError::Inference(format!(
                    "Output '{}' not found. Available outputs: {:?}",
                    self.output_name, available_outputs
                )));
            }
        };

        let predictions = output
            .try_extract_array::<f32>()
            .map_err(|e| RiceError::Inference(format!("Unexpected output type: {}", e)))?;

        // 期望 [1, N] 或 [N]
        let shape = predictions.shape();
        if shape.len() > 2 || (shape.len() == 2 && shape[0] != 1) {
            return Err(RiceError::Inference(format!(
                "Expected a single probability vector, got shape {:?}",
                shape
            )));
        }

        Ok(predictions.iter().copied().collect())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn load_error(model_path: &Path, err: impl std::fmt::Display) -> RiceError {
    RiceError::ModelLoad(format!("{}: {}", model_path.display(), err))
}

fn optimization_level(level: u8) -> GraphOptimizationLevel {
    match level {
        0 => GraphOptimizationLevel::Disable,
        1 => GraphOptimizationLevel::Level1,
        2 => GraphOptimizationLevel::Level2,
        _ => GraphOptimizationLevel::Level3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_model_file_is_a_load_error() {
        let config = OnnxConfig {
            intra_threads: 1,
            optimization_level: 3,
        };
        let err = OnnxClassifier::load(Path::new("/nonexistent/Resnet50.onnx"), &config)
            .err()
            .unwrap();
        assert!(matches!(err, RiceError::ModelLoad(_)));
        assert!(err.to_string().contains("Resnet50.onnx"));
    }
}
