//! 配置数据结构定义
//!
//! 定义应用程序的配置结构体和验证逻辑

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// 默认探测超时（毫秒）
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// 主配置结构，包含探测配置和图片列表
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// 探测配置项
    #[serde(default)]
    pub probe: ProbeConfig,
    /// 图片配置列表
    #[serde(default)]
    pub images: Vec<ImageConfig>,
}

/// 探测配置结构
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProbeConfig {
    /// 默认超时时间（毫秒）
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// 页面来源，设置后校验 Access-Control-Allow-Origin
    pub origin: Option<String>,
    /// 是否完整解码图片
    #[serde(default = "default_verify_decode")]
    pub verify_decode: bool,
    /// 响应体大小上限（字节）
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: u64,
    /// 自定义 User-Agent
    pub user_agent: Option<String>,
    /// 附加请求头（不允许携带凭据）
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            origin: None,
            verify_decode: default_verify_decode(),
            max_image_bytes: default_max_image_bytes(),
            user_agent: None,
            headers: HashMap::new(),
        }
    }
}

impl ProbeConfig {
    /// 默认超时时间
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// 图片配置结构
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageConfig {
    /// 图片名称
    pub name: String,
    /// 图片URL或本地路径
    pub url: String,
    /// 图片特定的超时时间（毫秒）
    pub timeout_ms: Option<u64>,
    /// 不可用时的占位图
    pub fallback: Option<String>,
    /// 是否启用
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl ImageConfig {
    /// 实际生效的超时时间
    pub fn effective_timeout(&self, probe: &ProbeConfig) -> Duration {
        Duration::from_millis(self.timeout_ms.unwrap_or(probe.timeout_ms))
    }
}

// 默认值函数
fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}
fn default_verify_decode() -> bool {
    true
}
fn default_max_image_bytes() -> u64 {
    20 * 1024 * 1024
}
fn default_enabled() -> bool {
    true
}

/// 匿名模式下禁止的请求头
const CREDENTIAL_HEADERS: [&str; 3] = ["cookie", "authorization", "proxy-authorization"];

/// 配置验证函数
///
/// # 参数
/// * `config` - 要验证的配置
///
/// # 返回
/// * `Result<(), String>` - 验证结果，错误时返回错误信息
pub fn validate_config(config: &Config) -> Result<(), String> {
    validate_probe_config(&config.probe)?;

    for image in &config.images {
        if image.name.trim().is_empty() {
            return Err("图片名称不能为空".to_string());
        }

        if image.url.trim().is_empty() {
            return Err(format!("图片 {} 的URL不能为空", image.name));
        }

        if image.timeout_ms == Some(0) {
            return Err(format!("图片 {} 的超时时间不能为0", image.name));
        }
    }

    Ok(())
}

/// 验证探测配置
pub fn validate_probe_config(probe: &ProbeConfig) -> Result<(), String> {
    if probe.timeout_ms == 0 {
        return Err("超时时间不能为0".to_string());
    }

    if probe.max_image_bytes == 0 {
        return Err("图片大小上限不能为0".to_string());
    }

    if let Some(origin) = &probe.origin {
        if !origin.starts_with("http://") && !origin.starts_with("https://") {
            return Err(format!("无效的来源: {origin}"));
        }
    }

    for key in probe.headers.keys() {
        if CREDENTIAL_HEADERS.contains(&key.to_ascii_lowercase().as_str()) {
            return Err(format!("匿名探测不允许携带凭据请求头: {key}"));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_config() -> Config {
        Config {
            probe: ProbeConfig {
                origin: Some("https://app.example".to_string()),
                ..Default::default()
            },
            images: vec![ImageConfig {
                name: "hero".to_string(),
                url: "https://cdn.example/hero.png".to_string(),
                timeout_ms: None,
                fallback: None,
                enabled: true,
            }],
        }
    }

    #[test]
    fn test_valid_config() {
        let config = create_test_config();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_empty_image_list_is_valid() {
        let config = Config::default();
        assert!(validate_config(&config).is_ok());
        assert_eq!(config.probe.timeout_ms, DEFAULT_TIMEOUT_MS);
    }

    #[test]
    fn test_zero_timeout() {
        let mut config = create_test_config();
        config.probe.timeout_ms = 0;
        assert!(validate_config(&config).is_err());

        let mut config = create_test_config();
        config.images[0].timeout_ms = Some(0);
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_invalid_origin() {
        let mut config = create_test_config();
        config.probe.origin = Some("app.example".to_string());
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_credential_headers_rejected() {
        let mut config = create_test_config();
        config
            .probe
            .headers
            .insert("Authorization".to_string(), "Bearer x".to_string());
        assert!(validate_config(&config).is_err());

        let mut config = create_test_config();
        config
            .probe
            .headers
            .insert("Accept".to_string(), "image/*".to_string());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_empty_image_fields() {
        let mut config = create_test_config();
        config.images[0].name = " ".to_string();
        assert!(validate_config(&config).is_err());

        let mut config = create_test_config();
        config.images[0].url = String::new();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_effective_timeout() {
        let config = create_test_config();
        let image = &config.images[0];
        assert_eq!(image.effective_timeout(&config.probe), Duration::from_millis(5000));

        let image = ImageConfig {
            timeout_ms: Some(250),
            ..image.clone()
        };
        assert_eq!(image.effective_timeout(&config.probe), Duration::from_millis(250));
    }
}
