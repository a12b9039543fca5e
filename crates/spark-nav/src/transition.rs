//! # 转换阶段状态机
//!
//! ## 状态机约束（What）
//! - 合法跃迁：`Idle → Guarding → Initializing → Committed`，其中 `Idle` 可直接进入
//!   `Initializing`（无守卫）或 `Committed`（空路由快速路径）；
//! - 守卫否决、回调失败或被更新请求取代时，任一进行中的阶段回落到 `Idle`；
//! - `Committed` 为单次请求的终态。
//!
//! ## 并发模型（How）
//! - 每个请求获得单调递增的令牌；只有持有最新令牌的请求可以提交，较旧的请求在提交点被丢弃。

use tracing::trace;

use crate::error::NavError;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[non_exhaustive]
pub enum TransitionPhase {
    /// 没有进行中的转换。
    Idle,
    /// 正在等待当前路由的离开守卫。
    Guarding,
    /// 正在等待目标路由的状态初始化。
    Initializing,
    /// 新状态已提交。
    Committed,
}

impl TransitionPhase {
    /// 判断是否允许跃迁至 `target`。
    pub fn can_transition_to(self, target: TransitionPhase) -> bool {
        matches!(
            (self, target),
            (TransitionPhase::Idle, TransitionPhase::Guarding)
                | (TransitionPhase::Idle, TransitionPhase::Initializing)
                | (TransitionPhase::Idle, TransitionPhase::Committed)
                | (TransitionPhase::Guarding, TransitionPhase::Initializing)
                | (TransitionPhase::Guarding, TransitionPhase::Idle)
                | (TransitionPhase::Initializing, TransitionPhase::Committed)
                | (TransitionPhase::Initializing, TransitionPhase::Idle)
        )
    }

    /// 是否处于需要等待外部回调的阶段。
    pub fn is_in_flight(self) -> bool {
        matches!(self, TransitionPhase::Guarding | TransitionPhase::Initializing)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TransitionPhase::Committed)
    }
}

/// 请求令牌，单调递增。
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn get(self) -> u64 {
        self.0
    }
}

/// 单个请求的阶段跟踪器。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingTransition {
    token: RequestToken,
    target: Option<String>,
    phase: TransitionPhase,
}

impl PendingTransition {
    pub fn token(&self) -> RequestToken {
        self.token
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn phase(&self) -> TransitionPhase {
        self.phase
    }

    /// 推进阶段；违反状态图时返回 [`NavError::InvalidPhaseTransition`] 且阶段保持不变。
    pub fn advance(&mut self, to: TransitionPhase) -> Result<(), NavError> {
        if !self.phase.can_transition_to(to) {
            return Err(NavError::InvalidPhaseTransition {
                from: self.phase,
                to,
            });
        }
        trace!(token = self.token.0, from = ?self.phase, to = ?to, "transition phase advanced");
        self.phase = to;
        Ok(())
    }
}

/// 令牌分配与“进行中转换”登记。
#[derive(Debug, Default)]
pub struct TransitionTracker {
    latest: u64,
    in_flight: Option<PendingTransition>,
}

impl TransitionTracker {
    /// 为新请求分配令牌；此前的请求自动变为过期。
    pub fn begin(&mut self, target: Option<&str>) -> PendingTransition {
        self.latest += 1;
        self.in_flight = None;
        PendingTransition {
            token: RequestToken(self.latest),
            target: target.map(str::to_owned),
            phase: TransitionPhase::Idle,
        }
    }

    pub fn is_latest(&self, token: RequestToken) -> bool {
        self.latest == token.0
    }

    /// 登记进行中的阶段；过期请求不登记。
    pub fn record(&mut self, pending: &PendingTransition) {
        if !self.is_latest(pending.token) {
            return;
        }
        self.in_flight = pending.phase.is_in_flight().then(|| pending.clone());
    }

    /// 当前进行中的转换（守卫或初始化阶段）。
    pub fn in_flight(&self) -> Option<&PendingTransition> {
        self.in_flight.as_ref()
    }

    pub fn phase(&self) -> TransitionPhase {
        self.in_flight
            .as_ref()
            .map_or(TransitionPhase::Idle, PendingTransition::phase)
    }
}
