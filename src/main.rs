//! Kestrel - 民用机器人任务编排系统
//!
//! 入口：初始化日志、加载配置、装配协作服务，执行一个任务：
//! `kestrel <mission.json>` 从文件读取任务定义；不带参数时运行内置演示任务。
//! Ctrl-C 触发取消令牌，循环在下一次迭代顶部退出。

use anyhow::Context;
use tokio_util::sync::CancellationToken;

use kestrel::config::load_config;
use kestrel::core::{create_mission_loop, create_services};
use kestrel::mission::{Mission, MissionType, Objective};

fn demo_mission() -> Mission {
    Mission::new(
        uuid::Uuid::new_v4().to_string(),
        "demo inspection",
        MissionType::Inspection,
        vec![
            Objective::primary("obj-1", "inspect north perimeter"),
            Objective::primary("obj-2", "inspect south perimeter"),
        ],
    )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    kestrel::observability::init();

    let cfg = load_config(None).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        kestrel::config::AppConfig::default()
    });

    let mission = match std::env::args().nth(1) {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read mission file {}", path))?;
            serde_json::from_str(&raw).context("Failed to parse mission definition")?
        }
        None => {
            tracing::info!("no mission file given, running built-in demo mission");
            demo_mission()
        }
    };

    let services = create_services(&cfg);
    let mission_loop = create_mission_loop(&cfg, &services);

    let cancel = CancellationToken::new();
    let cancel_on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("ctrl-c received, cancelling mission");
            cancel_on_signal.cancel();
        }
    });

    let result = mission_loop
        .execute_mission(mission, cancel)
        .await
        .context("Mission execution failed")?;

    println!(
        "mission {:?}: {}/{} objectives in {}ms",
        result.status, result.objectives_completed, result.objectives_total, result.duration_ms
    );
    for lesson in &result.lessons {
        println!("  - {}", lesson);
    }

    Ok(())
}
