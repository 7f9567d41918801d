//! yun-trace - 合并模式运动推导跟踪工具
//!
//! 读取 JSON 场景 (图像参数、slice、已解码预测块、合并/跳过 CU), 按解码顺序
//! 执行合并推导, 逐 PU 输出候选列表与最终运动.

mod logging;
mod scenario;

use anyhow::{Context, Result};
use clap::Parser;
use log::error;
use std::path::PathBuf;
use std::process;

/// Yun 合并模式运动推导跟踪工具
#[derive(Parser, Debug)]
#[command(name = "yun-trace", version, about = "HEVC 合并模式运动推导跟踪工具")]
struct Cli {
    /// 场景文件路径 (JSON)
    scenario: PathBuf,

    /// 输出 JSON 格式
    #[arg(long)]
    json: bool,

    /// 日志目录, 不指定时只输出到 stderr
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// 日志详细程度 (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = logging::init(cli.log_dir.as_deref(), "yun-trace", cli.verbose) {
        eprintln!("日志初始化失败: {:#}", e);
    }

    if let Err(e) = run(&cli) {
        error!("{:#}", e);
        eprintln!("错误: {:#}", e);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let text = std::fs::read_to_string(&cli.scenario)
        .with_context(|| format!("读取场景文件失败: {}", cli.scenario.display()))?;
    let scenario: scenario::Scenario = serde_json::from_str(&text)
        .with_context(|| format!("解析场景文件失败: {}", cli.scenario.display()))?;

    let traces = scenario::run(&scenario)?;
    if cli.json {
        let json = serde_json::to_string_pretty(&traces).context("序列化跟踪结果失败")?;
        println!("{json}");
    } else {
        for trace in &traces {
            println!("{trace}");
        }
    }
    Ok(())
}
