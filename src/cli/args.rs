//! 命令行参数定义
//!
//! 使用clap定义应用程序的命令行接口

use crate::logging::LogConfig;
use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use std::path::PathBuf;

/// Image Probe - 图片可用性检测工具
#[derive(Parser, Debug, Clone)]
#[command(
    name = "image-probe",
    version = crate::VERSION,
    about = crate::APP_DESCRIPTION,
    long_about = None
)]
pub struct Args {
    /// 配置文件路径
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "配置文件路径",
        env = "IMAGE_PROBE_CONFIG"
    )]
    pub config: Option<PathBuf>,

    /// 日志级别
    #[arg(
        short,
        long,
        value_enum,
        default_value = "info",
        help = "日志级别",
        env = "IMAGE_PROBE_LOG_LEVEL"
    )]
    pub log_level: LogLevel,

    /// 是否启用详细输出
    #[arg(short, long, help = "启用详细输出")]
    pub verbose: bool,

    /// 以JSON格式输出日志
    #[arg(long, help = "以JSON格式输出日志")]
    pub json_logs: bool,

    /// 日志文件路径
    #[arg(
        long,
        value_name = "FILE",
        help = "日志写入文件（默认输出到stderr）",
        env = "IMAGE_PROBE_LOG_FILE"
    )]
    pub log_file: Option<PathBuf>,

    /// 子命令
    #[command(subcommand)]
    pub command: Commands,
}

/// 日志级别枚举
#[derive(ValueEnum, Clone, Debug, PartialEq)]
pub enum LogLevel {
    /// 调试级别
    Debug,
    /// 信息级别
    Info,
    /// 警告级别
    Warn,
    /// 错误级别
    Error,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

/// 子命令定义
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// 检测图片是否可用
    Check {
        /// 图片URL或本地路径（不指定则检测配置文件中的图片）
        #[arg(value_name = "URL", help = "图片URL或本地路径")]
        urls: Vec<String>,

        /// 超时时间（毫秒）
        #[arg(
            short,
            long,
            value_name = "MILLIS",
            help = "超时时间（毫秒），默认使用配置值",
            env = "IMAGE_PROBE_TIMEOUT_MS"
        )]
        timeout_ms: Option<u64>,

        /// 输出格式
        #[arg(short, long, value_enum, default_value = "text", help = "输出格式")]
        format: OutputFormat,
    },

    /// 预加载单张图片，成功时输出URL
    Preload {
        /// 图片URL或本地路径
        #[arg(value_name = "URL", help = "图片URL或本地路径")]
        url: String,

        /// 超时时间（毫秒）
        #[arg(
            short,
            long,
            value_name = "MILLIS",
            help = "超时时间（毫秒），默认使用配置值",
            env = "IMAGE_PROBE_TIMEOUT_MS"
        )]
        timeout_ms: Option<u64>,
    },

    /// 审计JSON清单中引用的图片
    Audit {
        /// 清单文件路径
        #[arg(value_name = "MANIFEST", help = "清单文件路径")]
        manifest: PathBuf,

        /// 相对路径的基准（URL或目录）
        #[arg(short, long, value_name = "BASE", help = "相对路径的基准（URL或目录）")]
        base: Option<String>,

        /// 记录所在的数组字段
        #[arg(long, default_value = "doctors", help = "记录所在的数组字段")]
        collection: String,

        /// 记录中的图片字段
        #[arg(long, default_value = "image", help = "记录中的图片字段")]
        field: String,

        /// 不可用图片的占位图
        #[arg(long, value_name = "PATH", help = "不可用图片的占位图")]
        fallback: Option<String>,

        /// 写回清单文件
        #[arg(short, long, requires = "fallback", help = "用占位图替换后写回清单")]
        write: bool,

        /// 超时时间（毫秒）
        #[arg(
            short,
            long,
            value_name = "MILLIS",
            help = "超时时间（毫秒），默认使用配置值",
            env = "IMAGE_PROBE_TIMEOUT_MS"
        )]
        timeout_ms: Option<u64>,

        /// 输出格式
        #[arg(short, long, value_enum, default_value = "text", help = "输出格式")]
        format: OutputFormat,
    },

    /// 初始化配置文件
    Init {
        /// 配置文件路径
        #[arg(
            value_name = "FILE",
            help = "配置文件路径",
            default_value = "image-probe.toml"
        )]
        config_path: PathBuf,

        /// 是否覆盖现有文件
        #[arg(short, long, help = "覆盖现有文件")]
        force: bool,
    },

    /// 验证配置文件
    Validate {
        /// 配置文件路径
        #[arg(value_name = "FILE", help = "配置文件路径")]
        config_path: Option<PathBuf>,

        /// 是否显示详细信息
        #[arg(short, long, help = "显示详细信息")]
        verbose: bool,
    },

    /// 显示版本信息
    Version {
        /// 输出格式
        #[arg(short, long, value_enum, default_value = "text", help = "输出格式")]
        format: OutputFormat,
    },
}

/// 输出格式枚举
#[derive(ValueEnum, Clone, Debug, PartialEq)]
pub enum OutputFormat {
    /// 文本格式
    Text,
    /// JSON格式
    Json,
    /// 表格格式
    Table,
}

impl Args {
    /// 获取配置文件路径
    pub fn get_config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(crate::config::get_default_config_path)
    }

    /// 是否启用详细输出
    pub fn is_verbose(&self) -> bool {
        self.verbose || matches!(self.log_level, LogLevel::Debug)
    }

    /// 根据命令行参数构建日志配置，`--verbose` 时提升到 debug
    pub fn log_config(&self) -> LogConfig {
        let level = if self.is_verbose() {
            LevelFilter::Debug
        } else {
            self.log_level.clone().into()
        };

        LogConfig {
            level,
            file_path: self.log_file.clone(),
            json_format: self.json_logs,
        }
    }
}
