//! Image Probe 主程序入口
//!
//! 图片可用性检测工具

use anyhow::{Context, Result};
use clap::Parser;
use image_probe::cli::args::{Args, Commands};
use image_probe::cli::commands::{
    AuditCommand, CheckCommand, Command, InitCommand, PreloadCommand, ValidateCommand,
    VersionCommand,
};
use image_probe::logging::LoggingSystem;
use tracing::{debug, error};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _logging_system =
        LoggingSystem::setup_logging(args.log_config()).context("初始化日志系统失败")?;

    debug!("Image Probe v{} 启动", image_probe::VERSION);

    if let Err(e) = execute_command(&args).await {
        error!("命令执行失败: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// 执行CLI命令
async fn execute_command(args: &Args) -> Result<()> {
    let command: Box<dyn Command> = match &args.command {
        Commands::Check { .. } => Box::new(CheckCommand),
        Commands::Preload { .. } => Box::new(PreloadCommand),
        Commands::Audit { .. } => Box::new(AuditCommand),
        Commands::Init { .. } => Box::new(InitCommand),
        Commands::Validate { .. } => Box::new(ValidateCommand),
        Commands::Version { .. } => Box::new(VersionCommand),
    };

    command.execute(args).await.map_err(|e| anyhow::anyhow!(e))
}
