//! # beici-algo - 背词核心算法库
//!
//! 本 crate 提供纯 Rust 实现的复习调度算法:
//!
//! - **Ebbinghaus Scheduler** - 艾宾浩斯遗忘曲线阶梯调度
//! - **Review Selector** - 待复习单词的优先级排序与抽取
//!
//! ## 设计理念
//!
//! - **纯函数** - 调度器不读取系统时钟、不做 I/O，时间由调用方传入
//! - **可复现** - 选择器的随机扰动使用可注入种子的 RNG，测试完全确定
//! - **充分测试** - 状态机对全部 (stage, feedback) 组合有单元与属性测试
//!
//! ## 模块结构
//!
//! - [`scheduler`] - 阶段状态机 (advance、掌握判定)
//! - [`selector`] - 复习队列排序 (到期优先、错误次数、阶段)
//! - [`types`] - 公共类型和常量
//!
//! ## 使用示例
//!
//! ```rust
//! use beici_algo::{advance, Feedback, ReviewSelector};
//! use chrono::Utc;
//!
//! let schedule = advance(0, Feedback::Remember, Utc::now());
//! assert_eq!(schedule.next_stage, 1);
//!
//! let mut selector = ReviewSelector::with_seed(42);
//! let queue = selector.select(&[], Utc::now(), None, 10);
//! assert!(queue.is_empty());
//! ```

// ============================================================================
// 模块声明
// ============================================================================

pub mod scheduler;
pub mod selector;
pub mod types;

// ============================================================================
// 重新导出
// ============================================================================

/// 重新导出所有公共类型
pub use types::*;

/// 重新导出调度器
pub use scheduler::{advance, clamp_stage, masters, Schedule};

/// 重新导出复习选择器
pub use selector::ReviewSelector;
