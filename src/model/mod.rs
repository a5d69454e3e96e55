//! Model module for the grasp detection network using the Burn framework
//!
//! This module provides:
//! - `GraspNet`: the attention-gated residual grasp network
//! - `ResidualBlock` and `Cbam`: its building blocks
//! - `GraspNetConfig`: construction parameters and shape arithmetic
//! - `WeightInit`: kernel initialization for weight-bearing modules
//!
//! ## Architecture
//!
//! ```text
//! x_in ─ stem(9x9, 4x4/2, 4x4/2) ─ x3 ─ res1..res5 ─ x5
//!                                  │                  │
//!                        x3·(1+0.05·cbam3)  x5·(1+0.05·cbam5)
//!                                  └──── concat ──────┘
//!                                          │ 1x1
//!                       convT(4/2) ─ convT(4/2) ─ 9x9 ─┬─ pos
//!                                                      ├─ cos
//!                                                      ├─ sin
//!                                                      └─ width
//! ```

pub mod cbam;
pub mod config;
pub mod grasp_net;
pub mod init;
pub mod residual;

// Re-export main types for convenience
pub use cbam::Cbam;
pub use config::{GraspNetConfig, StageShape};
pub use grasp_net::{
    attention_blend, GraspLoss, GraspNet, GraspOutput, GraspTargets, ATTENTION_WEIGHT,
};
pub use init::{WeightInit, XAVIER_UNIFORM};
pub use residual::ResidualBlock;
