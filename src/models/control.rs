use crate::error::ControlError;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// 运行控制状态
///
/// `Stopped` 为终态，不可恢复；`Paused` 可以恢复为 `Running`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunControlState {
    #[default]
    Running,
    Paused,
    Stopped,
}

impl RunControlState {
    pub fn as_str(self) -> &'static str {
        match self {
            RunControlState::Running => "running",
            RunControlState::Paused => "paused",
            RunControlState::Stopped => "stopped",
        }
    }
}

impl Display for RunControlState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 控制文件内容：`{"state": "running"}`
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ControlFile {
    #[serde(default)]
    pub state: RunControlState,
}

/// 操作员发出的控制指令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    Pause,
    Resume,
    Stop,
}

impl ControlAction {
    /// 计算指令作用后的新状态
    ///
    /// 已停止的运行只接受再次停止
    pub fn apply(self, current: RunControlState) -> Result<RunControlState, ControlError> {
        match (current, self) {
            (RunControlState::Stopped, ControlAction::Stop) => Ok(RunControlState::Stopped),
            (RunControlState::Stopped, _) => Err(ControlError::AlreadyStopped),
            (_, ControlAction::Pause) => Ok(RunControlState::Paused),
            (_, ControlAction::Resume) => Ok(RunControlState::Running),
            (_, ControlAction::Stop) => Ok(RunControlState::Stopped),
        }
    }
}

impl FromStr for ControlAction {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pause" => Ok(ControlAction::Pause),
            "resume" => Ok(ControlAction::Resume),
            "stop" => Ok(ControlAction::Stop),
            other => Err(ControlError::InvalidAction(other.to_string())),
        }
    }
}
