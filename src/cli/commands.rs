//! 命令处理逻辑
//!
//! 实现各种CLI命令的处理逻辑

use crate::cli::args::{Args, Commands, OutputFormat};
use crate::config::{Config, ConfigLoader, TomlConfigLoader};
use crate::error::{ImageProbeError, Result};
use crate::manifest::{audit_manifest, AuditOptions, AuditSummary};
use crate::probe::{HttpImageProber, ImageChecker, ProbeReport, ProbeTarget};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// 命令处理器trait
#[async_trait]
pub trait Command: Send + Sync {
    /// 执行命令
    async fn execute(&self, args: &Args) -> Result<()>;
}

/// 加载配置：显式指定时必须存在，否则默认路径不存在就使用内置默认值
async fn load_config(args: &Args) -> Result<Config> {
    let loader = TomlConfigLoader::new(true);
    match &args.config {
        Some(path) => loader.load_from_file(path).await,
        None => {
            let path = args.get_config_path();
            if path.exists() {
                loader.load_from_file(path).await
            } else {
                debug!("未找到配置文件 {}，使用默认配置", path.display());
                Ok(Config::default())
            }
        }
    }
}

/// 根据配置和命令行覆盖构建探测器及默认超时
fn build_prober(config: &Config, timeout_ms: Option<u64>) -> Result<(HttpImageProber, Duration)> {
    let prober = HttpImageProber::new(config.probe.clone())?;
    let timeout = timeout_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| prober.default_timeout());
    Ok((prober, timeout))
}

/// 存在不可用图片时返回错误，使进程以非零状态退出
fn ensure_available(unavailable: usize, total: usize) -> Result<()> {
    if unavailable > 0 {
        return Err(ImageProbeError::Unavailable { unavailable, total });
    }
    Ok(())
}

/// 版本命令
pub struct VersionCommand;

#[async_trait]
impl Command for VersionCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Version { format } = &args.command {
            match format {
                OutputFormat::Json => {
                    let version_info = serde_json::json!({
                        "name": crate::APP_NAME,
                        "version": crate::VERSION,
                        "description": crate::APP_DESCRIPTION
                    });
                    println!("{}", serde_json::to_string_pretty(&version_info)?);
                }
                _ => {
                    println!("{} v{}", crate::APP_NAME, crate::VERSION);
                    println!("{}", crate::APP_DESCRIPTION);
                }
            }
        }
        Ok(())
    }
}

/// 初始化命令
pub struct InitCommand;

#[async_trait]
impl Command for InitCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Init { config_path, force } = &args.command {
            self.create_config_file(config_path, *force).await
        } else {
            Ok(())
        }
    }
}

impl InitCommand {
    /// 配置模板
    const TEMPLATE: &'static str = include_str!("../../templates/config.toml");

    /// 创建配置文件
    async fn create_config_file(&self, config_path: &Path, force: bool) -> Result<()> {
        if config_path.exists() && !force {
            eprintln!("配置文件已存在: {}", config_path.display());
            eprintln!("使用 --force 参数覆盖现有文件");
            return Ok(());
        }

        if let Some(parent) = config_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        tokio::fs::write(config_path, Self::TEMPLATE).await?;

        println!("配置文件已创建: {}", config_path.display());
        println!("请编辑配置文件以添加需要检测的图片");

        Ok(())
    }
}

/// 验证命令
pub struct ValidateCommand;

#[async_trait]
impl Command for ValidateCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Validate {
            config_path,
            verbose,
        } = &args.command
        {
            let config_file = config_path
                .clone()
                .unwrap_or_else(|| args.get_config_path());

            self.validate_config_file(&config_file, *verbose).await
        } else {
            Ok(())
        }
    }
}

impl ValidateCommand {
    /// 验证配置文件
    async fn validate_config_file(&self, config_path: &Path, verbose: bool) -> Result<()> {
        println!("验证配置文件: {}", config_path.display());

        let loader = TomlConfigLoader::new(true);
        let config = loader.load_from_file(config_path).await?;

        if verbose {
            println!("配置验证通过！");
            println!("探测配置:");
            println!("  超时时间: {}ms", config.probe.timeout_ms);
            println!(
                "  来源: {}",
                config.probe.origin.as_deref().unwrap_or("（不校验CORS）")
            );
            println!(
                "  完整解码: {}",
                if config.probe.verify_decode { "是" } else { "否" }
            );
            println!("  大小上限: {} 字节", config.probe.max_image_bytes);

            println!("图片配置:");
            for (i, image) in config.images.iter().enumerate() {
                println!("  {}. {} ({})", i + 1, image.name, image.url);
                println!(
                    "     超时: {}ms",
                    image.effective_timeout(&config.probe).as_millis()
                );
                if let Some(fallback) = &image.fallback {
                    println!("     占位图: {fallback}");
                }
                println!("     启用状态: {}", if image.enabled { "是" } else { "否" });
            }
        } else {
            println!("✓ 配置文件验证通过");
            println!("✓ 找到 {} 个图片配置", config.images.len());
        }

        Ok(())
    }
}

/// 检测命令
pub struct CheckCommand;

#[async_trait]
impl Command for CheckCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Check {
            urls,
            timeout_ms,
            format,
        } = &args.command
        {
            self.perform_check(args, urls, *timeout_ms, format).await
        } else {
            Ok(())
        }
    }
}

impl CheckCommand {
    /// 执行图片检测
    async fn perform_check(
        &self,
        args: &Args,
        urls: &[String],
        timeout_ms: Option<u64>,
        format: &OutputFormat,
    ) -> Result<()> {
        let config = load_config(args).await?;
        let (prober, timeout) = build_prober(&config, timeout_ms)?;

        let targets: Vec<ProbeTarget> = if urls.is_empty() {
            config
                .images
                .iter()
                .filter(|image| image.enabled)
                .map(|image| {
                    let timeout = timeout_ms
                        .map(Duration::from_millis)
                        .unwrap_or_else(|| image.effective_timeout(&config.probe));
                    ProbeTarget::new(image.url.clone(), timeout).with_name(image.name.clone())
                })
                .collect()
        } else {
            urls.iter()
                .map(|url| ProbeTarget::new(url.clone(), timeout))
                .collect()
        };

        if targets.is_empty() {
            eprintln!("未找到任何需要检测的图片");
            return Ok(());
        }

        let reports = prober.check_batch(&targets).await;

        match format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
            OutputFormat::Table => print_table_reports(&reports),
            OutputFormat::Text => print_text_reports(&reports),
        }

        if urls.is_empty() {
            // 配置中的图片不可用时提示占位图
            for (image, report) in config
                .images
                .iter()
                .filter(|image| image.enabled)
                .zip(&reports)
            {
                if let (false, Some(fallback)) = (report.is_available(), &image.fallback) {
                    println!("  → {} 可改用占位图: {}", image.name, fallback);
                }
            }
        }

        let unavailable = reports.iter().filter(|r| !r.is_available()).count();
        ensure_available(unavailable, reports.len())
    }
}

/// 预加载命令
pub struct PreloadCommand;

#[async_trait]
impl Command for PreloadCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Preload { url, timeout_ms } = &args.command {
            let config = load_config(args).await?;
            let (prober, timeout) = build_prober(&config, *timeout_ms)?;

            let loaded = prober.preload(url, timeout).await?;
            println!("{loaded}");
        }
        Ok(())
    }
}

/// 清单审计命令
pub struct AuditCommand;

#[async_trait]
impl Command for AuditCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Audit {
            manifest,
            base,
            collection,
            field,
            fallback,
            write,
            timeout_ms,
            format,
        } = &args.command
        {
            let config = load_config(args).await?;
            let (prober, timeout) = build_prober(&config, *timeout_ms)?;

            let options = AuditOptions {
                collection: collection.clone(),
                field: field.clone(),
                base: base.clone(),
                timeout,
                fallback: fallback.clone(),
            };

            let summary = audit_manifest(&prober, manifest, options, *write).await?;

            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
                _ => print_audit_summary(&summary, format),
            }

            if *write && summary.replaced > 0 {
                println!("已写回清单: {}", manifest.display());
            }

            ensure_available(summary.unavailable, summary.total - summary.skipped)?;
        }
        Ok(())
    }
}

/// 打印文本格式结果
fn print_text_reports(reports: &[ProbeReport]) {
    for report in reports {
        let status_icon = if report.is_available() { "✓" } else { "✗" };
        let label = report
            .name
            .as_ref()
            .map(|name| format!("{name} ({})", report.url))
            .unwrap_or_else(|| report.url.clone());

        match &report.image {
            Some(image) => println!(
                "{} {} - {} - {} {}x{} - {}ms",
                status_icon,
                label,
                report.outcome,
                image.format,
                image.width,
                image.height,
                report.elapsed_ms()
            ),
            None => println!(
                "{} {} - {} - {}ms",
                status_icon,
                label,
                report.outcome,
                report.elapsed_ms()
            ),
        }

        if let Some(error) = &report.error_message {
            println!("  错误: {error}");
        }
    }
}

/// 打印表格格式结果
fn print_table_reports(reports: &[ProbeReport]) {
    println!(
        "{:<40} {:<10} {:<8} {:<12} {:<10} {:<30}",
        "图片", "状态", "状态码", "尺寸", "耗时", "错误信息"
    );
    println!("{}", "-".repeat(115));

    for report in reports {
        let status_code = report
            .status_code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "N/A".to_string());
        let size = report
            .image
            .as_ref()
            .map(|image| format!("{}x{}", image.width, image.height))
            .unwrap_or_else(|| "N/A".to_string());

        println!(
            "{:<40} {:<10} {:<8} {:<12} {:<10} {:<30}",
            report.name.as_deref().unwrap_or(&report.url),
            report.outcome.to_string(),
            status_code,
            size,
            format!("{}ms", report.elapsed_ms()),
            report.error_message.as_deref().unwrap_or("")
        );
    }
}

/// 打印审计汇总
fn print_audit_summary(summary: &AuditSummary, format: &OutputFormat) {
    let reports: Vec<ProbeReport> = summary
        .entries
        .iter()
        .filter_map(|entry| entry.report.clone())
        .collect();

    if matches!(format, OutputFormat::Table) {
        print_table_reports(&reports);
    } else {
        print_text_reports(&reports);
    }

    for entry in summary.entries.iter().filter(|e| e.report.is_none()) {
        println!(
            "- 记录 #{} ({}) 缺少图片字段，已跳过",
            entry.index,
            entry.name.as_deref().unwrap_or("-")
        );
    }

    println!();
    println!(
        "共 {} 条：可用 {}，不可用 {}，跳过 {}，已替换 {}",
        summary.total, summary.available, summary.unavailable, summary.skipped, summary.replaced
    );
}
