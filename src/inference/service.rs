use crate::image::{ImageLoader, ImagePreprocessor, ImageTensor};
use crate::inference::{ClassificationReport, PredictionResult};
use crate::models::{ClassifierArtifact, ModelKind, ModelRegistry};
use crate::utils::error::RiceError;
use crate::Result;
use std::sync::Arc;
use std::time::Instant;

/// softmax输出的浮点误差容限
const PROBABILITY_TOLERANCE: f32 = 1e-4;

/// 返回最大值的下标，相同最大值取第一个
pub fn argmax(values: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &value) in values.iter().enumerate() {
        match best {
            Some((_, max)) if value <= max => {}
            _ => best = Some((i, value)),
        }
    }
    best.map(|(i, _)| i)
}

/// 推理并将概率向量映射为标签和置信度
pub fn classify(
    tensor: ImageTensor,
    artifact: &dyn ClassifierArtifact,
    labels: &[&str],
) -> Result<PredictionResult> {
    let probabilities = artifact.predict(tensor)?;

    if probabilities.len() != labels.len() {
        let err = RiceError::Inference(format!(
            "Model '{}' produced {} outputs but {} labels are configured",
            artifact.name(),
            probabilities.len(),
            labels.len()
        ));
        tracing::error!("{}", err);
        return Err(err);
    }

    if let Some(value) = probabilities.iter().find(|v| !v.is_finite()) {
        return Err(RiceError::Inference(format!(
            "Model '{}' produced a non-finite output: {}",
            artifact.name(),
            value
        )));
    }

    // 输出必须是概率（softmax），logits会得到超出0-100的置信度
    if let Some(value) = probabilities
        .iter()
        .find(|v| !(-PROBABILITY_TOLERANCE..=1.0 + PROBABILITY_TOLERANCE).contains(*v))
    {
        let err = RiceError::Inference(format!(
            "Model '{}' produced {} which is not a probability",
            artifact.name(),
            value
        ));
        tracing::error!("{}", err);
        return Err(err);
    }

    let index = argmax(&probabilities).ok_or_else(|| {
        RiceError::Inference(format!("Model '{}' produced no outputs", artifact.name()))
    })?;

    Ok(PredictionResult {
        label: labels[index].to_string(),
        confidence: (probabilities[index] * 100.0).clamp(0.0, 100.0),
    })
}

/// 完整的分类流程：解码、预处理、取模型、推理
#[derive(Clone)]
pub struct InferenceService {
    registry: Arc<ModelRegistry>,
    loader: ImageLoader,
    preprocessor: ImagePreprocessor,
}

impl InferenceService {
    pub fn new(
        registry: Arc<ModelRegistry>,
        loader: ImageLoader,
        preprocessor: ImagePreprocessor,
    ) -> Self {
        Self {
            registry,
            loader,
            preprocessor,
        }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn loader(&self) -> &ImageLoader {
        &self.loader
    }

    pub fn preprocessor(&self) -> &ImagePreprocessor {
        &self.preprocessor
    }

    /// 对上传的原始字节分类
    pub fn classify_bytes(&self, kind: ModelKind, bytes: &[u8]) -> Result<ClassificationReport> {
        let start_time = Instant::now();
        let image = self.loader.from_bytes(bytes)?;
        self.classify_image(kind, &image, start_time)
    }

    /// 对base64编码的图像分类
    pub fn classify_base64(&self, kind: ModelKind, data: &str) -> Result<ClassificationReport> {
        let start_time = Instant::now();
        let image = self.loader.from_base64(data)?;
        self.classify_image(kind, &image, start_time)
    }

    fn classify_image(
        &self,
        kind: ModelKind,
        image: &image::DynamicImage,
        start_time: Instant,
    ) -> Result<ClassificationReport> {
        let tensor = self.preprocessor.preprocess(image)?;
        let artifact = self.registry.classifier(kind)?;
        let prediction = classify(tensor, artifact.as_ref(), kind.labels())?;
        let processing_time = start_time.elapsed().as_secs_f32();

        tracing::info!(
            "Classified {}: {} in {:.3}s",
            kind.display_name(),
            prediction,
            processing_time
        );

        Ok(ClassificationReport {
            mode: kind,
            prediction,
            processing_time,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ArtifactLoader, TYPE_LABELS};
    use ::image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use ndarray::Array4;
    use std::io::Cursor;

    struct Fixed(Vec<f32>);

    impl ClassifierArtifact for Fixed {
        fn predict(&self, tensor: ImageTensor) -> Result<Vec<f32>> {
            assert_eq!(tensor.shape(), &[1, 224, 224, 3]);
            Ok(self.0.clone())
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    struct FixedLoader;

    impl ArtifactLoader for FixedLoader {
        fn load(&self, kind: ModelKind) -> Result<Arc<dyn ClassifierArtifact>> {
            let output = match kind {
                ModelKind::Type => vec![0.05, 0.05, 0.1, 0.6, 0.2],
                ModelKind::Grade => vec![0.2, 0.3, 0.5],
            };
            Ok(Arc::new(Fixed(output)))
        }

        fn source(&self, _kind: ModelKind) -> String {
            "memory".to_string()
        }
    }

    fn tensor() -> ImageTensor {
        ImageTensor::from_array(Array4::zeros((1, 224, 224, 3))).unwrap()
    }

    fn png_bytes() -> Vec<u8> {
        let image = RgbImage::from_pixel(40, 20, Rgb([230, 220, 200]));
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(image)
            .write_to(&mut buffer, ImageFormat::Png)
            .unwrap();
        buffer.into_inner()
    }

    fn service() -> InferenceService {
        InferenceService::new(
            Arc::new(ModelRegistry::new(Arc::new(FixedLoader))),
            ImageLoader::default(),
            ImagePreprocessor::default(),
        )
    }

    #[test]
    fn argmax_prefers_first_maximum() {
        assert_eq!(argmax(&[0.5, 0.5, 0.0, 0.0, 0.0]), Some(0));
        assert_eq!(argmax(&[0.1, 0.3, 0.3]), Some(1));
        assert_eq!(argmax(&[-1.0, -0.5]), Some(1));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn basmati_scenario() {
        let artifact = Fixed(vec![0.1, 0.7, 0.1, 0.05, 0.05]);
        let result = classify(tensor(), &artifact, &TYPE_LABELS).unwrap();
        assert_eq!(result.label, "Basmati");
        assert!((result.confidence - 70.0).abs() < 1e-4);
    }

    #[test]
    fn ties_resolve_to_first_label() {
        let artifact = Fixed(vec![0.5, 0.5, 0.0, 0.0, 0.0]);
        for _ in 0..3 {
            let result = classify(tensor(), &artifact, &TYPE_LABELS).unwrap();
            assert_eq!(result.label, "Arborio");
        }
    }

    #[test]
    fn confidence_is_max_probability_scaled() {
        let vectors = [
            vec![0.2, 0.3, 0.5],
            vec![0.9, 0.05, 0.05],
            vec![0.0, 1.0, 0.0],
        ];
        for v in vectors {
            let max = v.iter().cloned().fold(f32::MIN, f32::max);
            let expected = ModelKind::Grade.labels()[argmax(&v).unwrap()];
            let result = classify(tensor(), &Fixed(v), ModelKind::Grade.labels()).unwrap();
            assert_eq!(result.label, expected);
            assert!((result.confidence - max * 100.0).abs() < 1e-4);
        }
    }

    #[test]
    fn length_mismatch_is_an_inference_error() {
        let artifact = Fixed(vec![0.2, 0.8]);
        let err = classify(tensor(), &artifact, ModelKind::Grade.labels()).unwrap_err();
        assert!(matches!(err, RiceError::Inference(_)));

        let artifact = Fixed(vec![0.1; 6]);
        let err = classify(tensor(), &artifact, &TYPE_LABELS).unwrap_err();
        assert!(matches!(err, RiceError::Inference(_)));
    }

    #[test]
    fn empty_and_nan_outputs_are_rejected() {
        let err = classify(tensor(), &Fixed(vec![]), &[]).unwrap_err();
        assert!(matches!(err, RiceError::Inference(_)));

        let err = classify(tensor(), &Fixed(vec![0.1, f32::NAN, 0.2]), ModelKind::Grade.labels())
            .unwrap_err();
        assert!(matches!(err, RiceError::Inference(_)));
    }

    #[test]
    fn logit_outputs_are_rejected() {
        let err = classify(tensor(), &Fixed(vec![2.3, -1.0, 0.5]), ModelKind::Grade.labels())
            .unwrap_err();
        assert!(matches!(err, RiceError::Inference(_)));

        let err = classify(tensor(), &Fixed(vec![0.2, -0.3, 0.1]), ModelKind::Grade.labels())
            .unwrap_err();
        assert!(matches!(err, RiceError::Inference(_)));
    }

    #[test]
    fn rounding_above_one_stays_within_percent_range() {
        let artifact = Fixed(vec![1.00005, 0.0, 0.0]);
        let result = classify(tensor(), &artifact, ModelKind::Grade.labels()).unwrap();
        assert_eq!(result.label, "Good");
        assert!(result.confidence <= 100.0);
    }

    #[test]
    fn pipeline_classifies_uploaded_bytes() {
        let service = service();
        let report = service.classify_bytes(ModelKind::Type, &png_bytes()).unwrap();
        assert_eq!(report.mode, ModelKind::Type);
        assert_eq!(report.prediction.label, "Jasmine");

        let report = service.classify_bytes(ModelKind::Grade, &png_bytes()).unwrap();
        assert_eq!(report.prediction.label, "Poor");
        assert!((report.prediction.confidence - 50.0).abs() < 1e-4);
    }

    #[test]
    fn pipeline_rejects_malformed_images_before_loading_models() {
        let service = service();
        let err = service
            .classify_bytes(ModelKind::Type, b"\x89PNG\r\n\x1a\nbroken")
            .unwrap_err();
        assert!(matches!(err, RiceError::UnsupportedImage(_)));
        assert!(!service.registry().is_loaded(ModelKind::Type));
    }
}
