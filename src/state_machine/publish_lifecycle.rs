// Copyright (c) 2025 - Cowboy AI, Inc.
//! Publish Lifecycle State Machine
//!
//! Tracks one change publication against the version-control service. The
//! publisher performs each remote call and then feeds the matching step.
//!
//! # States
//!
//! - Idle: nothing sent yet
//! - BranchCreated: working branch exists
//! - FilesStaged: every intent file is committed or found unchanged
//! - RequestOpened: merge request exists
//! - Done: publication complete (terminal)
//! - Failed: a remote call failed (terminal)
//!
//! # Steps
//!
//! - CreateBranch: Idle → BranchCreated
//! - StageFiles: BranchCreated → FilesStaged
//! - OpenRequest: FilesStaged → RequestOpened
//! - Finish: RequestOpened → Done
//! - Abort: any non-terminal → Failed

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{StateMachine, TransitionError, TransitionResult};

/// Publication stage (FSM state)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PublishStage {
    Idle,
    BranchCreated,
    FilesStaged,
    RequestOpened,
    Done,
    Failed,
}

impl PublishStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PublishStage::Done | PublishStage::Failed)
    }
}

impl fmt::Display for PublishStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Publication step (FSM input)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PublishStep {
    CreateBranch { branch: String },
    StageFiles { committed: usize, unchanged: usize },
    OpenRequest { state: String },
    Finish,
    Abort { reason: String },
}

/// Transition output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageOutput {
    pub warnings: Vec<String>,
    pub is_terminal: bool,
}

impl StageOutput {
    fn ok() -> Self {
        Self {
            warnings: Vec::new(),
            is_terminal: false,
        }
    }

    fn terminal(warnings: Vec<String>) -> Self {
        Self {
            warnings,
            is_terminal: true,
        }
    }
}

impl StateMachine for PublishStage {
    type Input = PublishStep;
    type Output = StageOutput;

    fn transition(&self, input: &Self::Input) -> TransitionResult<(Self, Self::Output)> {
        use PublishStage::*;
        use PublishStep::*;

        match (self, input) {
            (Done | Failed, _) => Err(TransitionError::Terminal(self.to_string())),

            (Idle, CreateBranch { .. }) => Ok((BranchCreated, StageOutput::ok())),
            (BranchCreated, StageFiles { committed, .. }) => {
                let mut output = StageOutput::ok();
                if *committed == 0 {
                    output
                        .warnings
                        .push("No intent file changed; merge request will be empty".to_string());
                }
                Ok((FilesStaged, output))
            }
            (FilesStaged, OpenRequest { .. }) => Ok((RequestOpened, StageOutput::ok())),
            (RequestOpened, Finish) => Ok((Done, StageOutput::terminal(Vec::new()))),

            (_, Abort { reason }) => Ok((Failed, StageOutput::terminal(vec![reason.clone()]))),

            (from, input) => Err(TransitionError::InvalidTransition {
                from: from.to_string(),
                input: format!("{:?}", input),
            }),
        }
    }
}
