use crate::image::Normalization;
use crate::models::ModelKind;
use crate::Result;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    /// 服务器绑定地址
    pub bind_addr: String,

    /// 模型文件目录
    pub models_dir: PathBuf,

    /// 类型分类模型路径（覆盖默认文件名）
    pub type_model: Option<PathBuf>,

    /// 品质分级模型路径（覆盖默认文件名）
    pub grade_model: Option<PathBuf>,

    /// 模型期望的输入归一化方式
    pub normalization: Normalization,

    /// 工作线程数量
    pub workers: usize,

    /// 开发模式
    pub dev_mode: bool,

    /// ONNX Runtime配置
    pub onnx_config: OnnxConfig,

    /// 服务器配置
    pub server_config: ServerConfig,
}

#[derive(Debug, Clone)]
pub struct OnnxConfig {
    /// CPU线程数
    pub intra_threads: usize,

    /// 优化级别 (0-3)
    pub optimization_level: u8,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// 请求超时时间（秒）
    pub request_timeout: u64,

    /// 最大请求体大小（字节）
    pub max_request_size: usize,
}

impl Config {
    pub fn new(
        bind_addr: String,
        models_dir: String,
        workers: Option<usize>,
        dev_mode: bool,
    ) -> Result<Self> {
        let cpu_cores = num_cpus::get();
        let workers = workers.unwrap_or(cpu_cores);

        if workers == 0 {
            return Err(crate::RiceError::Config(
                "Worker count must be at least 1".to_string(),
            ));
        }

        let onnx_config = OnnxConfig {
            intra_threads: (cpu_cores * 3 / 4).max(1),
            optimization_level: 3,
        };

        let server_config = ServerConfig {
            request_timeout: if dev_mode { 300 } else { 60 },
            max_request_size: 20 * 1024 * 1024,
        };

        Ok(Self {
            bind_addr,
            models_dir: PathBuf::from(models_dir),
            type_model: None,
            grade_model: None,
            normalization: Normalization::default(),
            workers,
            dev_mode,
            onnx_config,
            server_config,
        })
    }

    pub fn with_model_overrides(
        mut self,
        type_model: Option<PathBuf>,
        grade_model: Option<PathBuf>,
    ) -> Self {
        self.type_model = type_model;
        self.grade_model = grade_model;
        self
    }

    pub fn with_normalization(mut self, normalization: Normalization) -> Self {
        self.normalization = normalization;
        self
    }

    /// 获取指定模式的模型路径
    pub fn model_path(&self, kind: ModelKind) -> PathBuf {
        let override_path = match kind {
            ModelKind::Type => self.type_model.as_ref(),
            ModelKind::Grade => self.grade_model.as_ref(),
        };

        override_path
            .cloned()
            .unwrap_or_else(|| self.models_dir.join(kind.file_name()))
    }

    /// 获取类型分类模型路径
    pub fn type_model_path(&self) -> PathBuf {
        self.model_path(ModelKind::Type)
    }

    /// 获取品质分级模型路径
    pub fn grade_model_path(&self) -> PathBuf {
        self.model_path(ModelKind::Grade)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config::new("127.0.0.1:0".into(), "models".into(), Some(2), false).unwrap()
    }

    #[test]
    fn default_model_paths_live_in_models_dir() {
        let config = config();
        assert_eq!(config.type_model_path(), PathBuf::from("models/Resnet50.onnx"));
        assert_eq!(
            config.grade_model_path(),
            PathBuf::from("models/rice_grad_resnet50.onnx")
        );
    }

    #[test]
    fn overrides_take_precedence() {
        let config = config().with_model_overrides(Some(PathBuf::from("/tmp/type.onnx")), None);
        assert_eq!(config.type_model_path(), PathBuf::from("/tmp/type.onnx"));
        assert_eq!(
            config.grade_model_path(),
            PathBuf::from("models/rice_grad_resnet50.onnx")
        );
    }

    #[test]
    fn zero_workers_is_rejected() {
        let err = Config::new("127.0.0.1:0".into(), "models".into(), Some(0), false).unwrap_err();
        assert!(matches!(err, crate::RiceError::Config(_)));
    }

    #[test]
    fn dev_mode_extends_timeout() {
        let dev = Config::new("127.0.0.1:0".into(), "models".into(), Some(1), true).unwrap();
        assert_eq!(dev.server_config.request_timeout, 300);
        assert_eq!(config().server_config.request_timeout, 60);
    }
}
