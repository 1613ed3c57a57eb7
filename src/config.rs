//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `KESTREL__*` 覆盖
//! （双下划线表示嵌套，如 `KESTREL__RESILIENCE__MAX_ATTEMPTS=5`）。

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub mission_loop: LoopSection,
    pub executor: ExecutorSection,
    pub resilience: ResilienceSection,
    pub perception: ServiceSection,
    pub reasoning: ServiceSection,
    pub knowledge: KnowledgeSection,
    pub geospatial: ServiceSection,
}

/// [app] 段
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppSection {
    pub name: Option<String>,
}

/// [mission_loop] 段：迭代上限、节流、可选任务时限
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoopSection {
    pub max_iterations: usize,
    pub pacing_ms: u64,
    pub max_duration_secs: Option<u64>,
    /// HIGH 优先级行人数超过该值触发 replan
    pub crowd_threshold: usize,
}

impl Default for LoopSection {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            pacing_ms: 100,
            max_duration_secs: None,
            crowd_threshold: 3,
        }
    }
}

/// [executor] 段
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExecutorSection {
    /// pause-for-safety 固定保持时长（秒）
    pub pause_hold_secs: u64,
}

impl Default for ExecutorSection {
    fn default() -> Self {
        Self { pause_hold_secs: 5 }
    }
}

/// [resilience] 段：重试与熔断参数（所有协作服务共用）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResilienceSection {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub failure_threshold: u32,
    pub reset_timeout_secs: u64,
}

impl Default for ResilienceSection {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            backoff_multiplier: 2.0,
            failure_threshold: 5,
            reset_timeout_secs: 30,
        }
    }
}

/// 单个协作服务的端点与超时；base_url 未设置时使用模拟实现
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceSection {
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    /// 感知服务的检测置信度下限（其余服务忽略）
    pub min_confidence: f64,
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: 10,
            min_confidence: 0.7,
        }
    }
}

/// [knowledge] 段：端点 + 在途写入上限
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KnowledgeSection {
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    pub max_in_flight_writes: usize,
}

impl Default for KnowledgeSection {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: 10,
            max_in_flight_writes: 8,
        }
    }
}

impl AppConfig {
    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.mission_loop.pacing_ms)
    }

    pub fn pause_hold(&self) -> Duration {
        Duration::from_secs(self.executor.pause_hold_secs)
    }
}

/// 从 config 目录加载配置，环境变量 KESTREL__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 KESTREL__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("KESTREL")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_defaults_match_spec_values() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.mission_loop.max_iterations, 50);
        assert_eq!(cfg.mission_loop.pacing_ms, 100);
        assert_eq!(cfg.mission_loop.crowd_threshold, 3);
        assert_eq!(cfg.executor.pause_hold_secs, 5);
        assert_eq!(cfg.resilience.max_attempts, 3);
        assert_eq!(cfg.resilience.base_delay_ms, 1000);
        assert_eq!(cfg.resilience.failure_threshold, 5);
        assert_eq!(cfg.resilience.reset_timeout_secs, 30);
        assert_eq!(cfg.perception.min_confidence, 0.7);
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kestrel.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(
            f,
            "[mission_loop]\nmax_iterations = 10\n\n[reasoning]\ntimeout_secs = 45\n"
        )
        .unwrap();

        let cfg = load_config(Some(path)).unwrap();
        assert_eq!(cfg.mission_loop.max_iterations, 10);
        assert_eq!(cfg.reasoning.timeout_secs, 45);
        // 未覆盖的键保持默认
        assert_eq!(cfg.resilience.max_attempts, 3);
    }
}
