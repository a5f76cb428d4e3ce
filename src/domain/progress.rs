// ==========================================
// 竞品目录匹配系统 - 导入进度
// ==========================================
// 职责: 单次导入任务的可观察状态
// 红线: 状态单调流转 idle → processing → {complete | error}，不可回退
// ==========================================

use crate::domain::types::{ImportStatus, StepState};
use crate::importer::error::{ImportError, ImportResult};
use serde::{Deserialize, Serialize};

/// 导入流程步骤（顺序即执行顺序）
pub const IMPORT_STEPS: [&str; 5] = [
    "校验目录数据",
    "生成标准记录",
    "写入临时文件",
    "调用匹配引擎",
    "汇总引擎结果",
];

// ==========================================
// ImportProgress - 进度快照
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportProgress {
    pub status: ImportStatus,
    pub current_step: usize,
    pub total_steps: usize,
    /// 最近交给引擎的型号
    pub current_product: Option<String>,
    pub processed_products: usize,
    pub total_products: usize,
    pub message: String,
    pub error: Option<String>,
}

impl Default for ImportProgress {
    fn default() -> Self {
        Self::idle()
    }
}

impl ImportProgress {
    /// 初始状态
    pub fn idle() -> Self {
        Self {
            status: ImportStatus::Idle,
            current_step: 0,
            total_steps: IMPORT_STEPS.len(),
            current_product: None,
            processed_products: 0,
            total_products: 0,
            message: "等待开始".to_string(),
            error: None,
        }
    }

    fn transition(&mut self, next: ImportStatus) -> ImportResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(ImportError::InvalidStateTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        Ok(())
    }

    /// idle → processing
    pub fn begin(&mut self, total_products: usize) -> ImportResult<()> {
        self.transition(ImportStatus::Processing)?;
        self.current_step = 0;
        self.total_products = total_products;
        self.processed_products = 0;
        self.message = IMPORT_STEPS[0].to_string();
        Ok(())
    }

    /// 进入下一阶段（仅 processing 状态有效，步骤不可回退）
    pub fn advance(&mut self, step: usize) -> ImportResult<()> {
        if self.status != ImportStatus::Processing {
            return Err(ImportError::InvalidStateTransition {
                from: self.status.to_string(),
                to: format!("step {}", step),
            });
        }
        let step = step.min(self.total_steps.saturating_sub(1));
        self.current_step = self.current_step.max(step);
        self.message = IMPORT_STEPS[self.current_step].to_string();
        Ok(())
    }

    /// processing → complete
    pub fn complete(&mut self, processed: usize, message: impl Into<String>) -> ImportResult<()> {
        self.transition(ImportStatus::Complete)?;
        self.current_step = self.total_steps;
        self.processed_products = processed;
        self.message = message.into();
        Ok(())
    }

    /// processing → error
    pub fn fail(&mut self, message: impl Into<String>, error: Option<String>) -> ImportResult<()> {
        self.transition(ImportStatus::Error)?;
        self.message = message.into();
        self.error = error;
        Ok(())
    }

    /// 已处理百分比（四舍五入），总数为 0 时为 0
    pub fn percentage(&self) -> u32 {
        if self.total_products == 0 {
            return 0;
        }
        let ratio = self.processed_products as f64 / self.total_products as f64;
        (ratio * 100.0).round() as u32
    }

    /// 第 index 步相对当前步骤的状态
    pub fn step_state(&self, index: usize) -> StepState {
        if index < self.current_step {
            StepState::Complete
        } else if index == self.current_step {
            StepState::Active
        } else {
            StepState::Pending
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        let mut progress = ImportProgress::idle();
        progress.begin(3).unwrap();
        assert_eq!(progress.status, ImportStatus::Processing);
        assert_eq!(progress.total_products, 3);

        progress.advance(2).unwrap();
        assert_eq!(progress.step_state(1), StepState::Complete);
        assert_eq!(progress.step_state(2), StepState::Active);
        assert_eq!(progress.step_state(3), StepState::Pending);

        progress.complete(2, "完成").unwrap();
        assert_eq!(progress.status, ImportStatus::Complete);
        assert_eq!(progress.percentage(), 67);
    }

    #[test]
    fn test_terminal_state_never_reverts() {
        let mut progress = ImportProgress::idle();
        progress.begin(1).unwrap();
        progress.fail("失败", Some("stderr".to_string())).unwrap();

        assert!(progress.begin(1).is_err());
        assert!(progress.complete(1, "x").is_err());
        assert!(progress.advance(1).is_err());
        assert_eq!(progress.status, ImportStatus::Error);
        assert_eq!(progress.error.as_deref(), Some("stderr"));
    }

    #[test]
    fn test_idle_cannot_complete_directly() {
        let mut progress = ImportProgress::idle();
        assert!(matches!(
            progress.complete(0, "x"),
            Err(ImportError::InvalidStateTransition { .. })
        ));
        assert_eq!(progress.status, ImportStatus::Idle);
    }

    #[test]
    fn test_step_never_moves_backwards() {
        let mut progress = ImportProgress::idle();
        progress.begin(0).unwrap();
        progress.advance(3).unwrap();
        progress.advance(1).unwrap();
        assert_eq!(progress.current_step, 3);
        assert_eq!(progress.percentage(), 0);
    }
}
