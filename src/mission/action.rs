//! 动作闭集与执行结果
//!
//! 动作以闭合 enum 表达，执行器对其做穷尽分派，拼错或新增动作在编译期即暴露。

use serde::{Deserialize, Serialize};

/// 动作闭集
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    ContinuePath,
    AvoidObstacle,
    InspectArea,
    CollectData,
    DeliverPackage,
    ScanForPeople,
    ReturnToBase,
    PauseForSafety,
    Abort,
}

impl Action {
    /// 全部可选动作，按固定顺序提交给推理服务
    pub const ALL: [Action; 9] = [
        Action::ContinuePath,
        Action::AvoidObstacle,
        Action::InspectArea,
        Action::CollectData,
        Action::DeliverPackage,
        Action::ScanForPeople,
        Action::ReturnToBase,
        Action::PauseForSafety,
        Action::Abort,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::ContinuePath => "continue-path",
            Action::AvoidObstacle => "avoid-obstacle",
            Action::InspectArea => "inspect-area",
            Action::CollectData => "collect-data",
            Action::DeliverPackage => "deliver-package",
            Action::ScanForPeople => "scan-for-people",
            Action::ReturnToBase => "return-to-base",
            Action::PauseForSafety => "pause-for-safety",
            Action::Abort => "abort",
        }
    }

    /// 从推理服务返回的决策字符串解析；闭集之外返回 None
    pub fn parse(s: &str) -> Option<Action> {
        Action::ALL
            .iter()
            .copied()
            .find(|a| a.as_str() == s.trim().to_lowercase())
    }

    /// 成功执行后是否推进任务目标（巡检 / 采集 / 投递 / 搜寻）；
    /// 控制类动作（continue / avoid / return / pause / abort）不推进目标
    pub fn advances_objective(&self) -> bool {
        matches!(
            self,
            Action::InspectArea
                | Action::CollectData
                | Action::DeliverPackage
                | Action::ScanForPeople
        )
    }
}

/// 规划结果：动作 + 推理依据 + 置信度
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedAction {
    pub action: Action,
    pub rationale: String,
    pub confidence: f64,
}

/// 动作执行结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    pub message: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl ActionResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }

    pub fn ok_with(message: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roundtrip_for_all_actions() {
        for a in Action::ALL {
            assert_eq!(Action::parse(a.as_str()), Some(a));
        }
    }

    #[test]
    fn test_parse_tolerates_case_and_whitespace() {
        assert_eq!(Action::parse(" Scan-For-People "), Some(Action::ScanForPeople));
    }

    #[test]
    fn test_parse_rejects_unknown_action() {
        assert_eq!(Action::parse("self-destruct"), None);
        assert_eq!(Action::parse(""), None);
    }

    #[test]
    fn test_objective_advancing_actions() {
        assert!(Action::InspectArea.advances_objective());
        assert!(Action::DeliverPackage.advances_objective());
        assert!(!Action::ContinuePath.advances_objective());
        assert!(!Action::Abort.advances_objective());
    }
}
