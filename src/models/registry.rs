use crate::models::{ClassifierArtifact, ModelKind, OnnxClassifier};
use crate::{Config, Result};
use once_cell::sync::OnceCell;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

/// 模型加载策略，生产环境从磁盘加载ONNX，测试时可替换
pub trait ArtifactLoader: Send + Sync {
    fn load(&self, kind: ModelKind) -> Result<Arc<dyn ClassifierArtifact>>;

    /// 模型来源描述（用于信息接口）
    fn source(&self, kind: ModelKind) -> String;
}

/// 从配置的路径加载ONNX模型
pub struct OnnxLoader {
    config: Config,
}

impl OnnxLoader {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn model_path(&self, kind: ModelKind) -> PathBuf {
        self.config.model_path(kind)
    }
}

impl ArtifactLoader for OnnxLoader {
    fn load(&self, kind: ModelKind) -> Result<Arc<dyn ClassifierArtifact>> {
        let classifier = OnnxClassifier::load(&self.model_path(kind), &self.config.onnx_config)?;
        Ok(Arc::new(classifier))
    }

    fn source(&self, kind: ModelKind) -> String {
        self.model_path(kind).display().to_string()
    }
}

/// 模型注册表：每个模型只加载一次，之后直接返回缓存
pub struct ModelRegistry {
    loader: Arc<dyn ArtifactLoader>,
    type_classifier: OnceCell<Arc<dyn ClassifierArtifact>>,
    grade_classifier: OnceCell<Arc<dyn ClassifierArtifact>>,
}

impl ModelRegistry {
    pub fn new(loader: Arc<dyn ArtifactLoader>) -> Self {
        Self {
            loader,
            type_classifier: OnceCell::new(),
            grade_classifier: OnceCell::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(Arc::new(OnnxLoader::new(config.clone())))
    }

    fn slot(&self, kind: ModelKind) -> &OnceCell<Arc<dyn ClassifierArtifact>> {
        match kind {
            ModelKind::Type => &self.type_classifier,
            ModelKind::Grade => &self.grade_classifier,
        }
    }

    /// 获取指定模式的模型，首次调用时加载
    pub fn classifier(&self, kind: ModelKind) -> Result<Arc<dyn ClassifierArtifact>> {
        // 并发的首次调用只会触发一次加载
        let artifact = self.slot(kind).get_or_try_init(|| {
            tracing::info!("Loading {} model...", kind.display_name());
            let artifact = self.loader.load(kind)?;
            tracing::info!("{} model '{}' loaded", kind, artifact.name());
            Ok::<_, crate::RiceError>(artifact)
        })?;

        Ok(Arc::clone(artifact))
    }

    /// 获取类型分类模型
    pub fn type_classifier(&self) -> Result<Arc<dyn ClassifierArtifact>> {
        self.classifier(ModelKind::Type)
    }

    /// 获取品质分级模型
    pub fn grade_classifier(&self) -> Result<Arc<dyn ClassifierArtifact>> {
        self.classifier(ModelKind::Grade)
    }

    /// 启动时预加载全部模型，任何失败都应终止服务
    pub fn preload(&self) -> Result<()> {
        for kind in ModelKind::ALL {
            self.classifier(kind)?;
        }
        tracing::info!("All models loaded");
        Ok(())
    }

    pub fn is_loaded(&self, kind: ModelKind) -> bool {
        self.slot(kind).get().is_some()
    }

    /// 获取模型统计信息
    pub fn stats(&self) -> Vec<ModelStats> {
        ModelKind::ALL
            .iter()
            .map(|&kind| ModelStats {
                mode: kind,
                source: self.loader.source(kind),
                labels: kind.labels().to_vec(),
                loaded: self.is_loaded(kind),
                name: self.slot(kind).get().map(|a| a.name().to_string()),
            })
            .collect()
    }
}

/// 模型统计信息
#[derive(Debug, Clone, Serialize)]
pub struct ModelStats {
    pub mode: ModelKind,
    pub source: String,
    pub labels: Vec<&'static str>,
    pub loaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}
