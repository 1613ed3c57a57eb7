//! Kestrel - 民用机器人任务编排系统
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误分类、执行上下文、服务装配
//! - **mission**: 任务数据模型（Mission / WorldState / Action / MissionResult）
//! - **services**: 外部协作服务接口与实现（弹性客户端、熔断器、HTTP / Simulated）
//! - **react**: Assess -> Plan -> Act -> Observe -> Evaluate 任务主循环

pub mod config;
pub mod core;
pub mod mission;
pub mod observability;
pub mod react;
pub mod services;
