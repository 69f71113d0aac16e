// Copyright (c) 2025 - Cowboy AI, Inc.
//! Finite State Machine Abstractions
//!
//! Generic state machine types used to model multi-step workflows that talk to
//! external collaborators. Transitions are pure: the caller performs the side
//! effect, then feeds the matching input to the machine.
//!
//! ```text
//! (State, Input) → (State, Output)
//! ```
//!
//! [`StateMachineWithHistory`] records every accepted transition with its
//! timestamp so a finished workflow can report how it got where it is.

pub mod publish_lifecycle;

pub use publish_lifecycle::{PublishStage, PublishStep, StageOutput};

/// Result of a state transition
pub type TransitionResult<S> = Result<S, TransitionError>;

/// Errors that can occur during state transitions
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    /// Input is not accepted in the current state
    #[error("Invalid transition from {from} on {input}")]
    InvalidTransition { from: String, input: String },

    /// Current state is terminal
    #[error("State {0} is terminal")]
    Terminal(String),
}

/// Trait for finite state machines
pub trait StateMachine: Sized + Clone {
    /// Input type that triggers transitions
    type Input;

    /// Output type produced by transitions (use () if none)
    type Output;

    /// Attempt to transition to a new state given an input
    fn transition(&self, input: &Self::Input) -> TransitionResult<(Self, Self::Output)>;

    /// Check if a transition is valid without performing it
    fn can_transition(&self, input: &Self::Input) -> bool {
        self.transition(input).is_ok()
    }
}

/// Transition record
#[derive(Debug, Clone, PartialEq)]
pub struct Transition<S, I> {
    pub from: S,
    pub to: S,
    pub input: I,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl<S, I> Transition<S, I> {
    pub fn new(from: S, to: S, input: I, timestamp: chrono::DateTime<chrono::Utc>) -> Self {
        Self {
            from,
            to,
            input,
            timestamp,
        }
    }
}

/// State machine with history
#[derive(Debug, Clone)]
pub struct StateMachineWithHistory<FSM: StateMachine> {
    /// Current state
    pub current: FSM,

    /// Transition history
    pub history: Vec<Transition<FSM, FSM::Input>>,
}

impl<FSM: StateMachine> StateMachineWithHistory<FSM> {
    pub fn new(initial: FSM) -> Self {
        Self {
            current: initial,
            history: Vec::new(),
        }
    }

    /// Transition with history recording
    ///
    /// A rejected input leaves both state and history untouched.
    pub fn transition_with_history(
        &mut self,
        input: FSM::Input,
        timestamp: chrono::DateTime<chrono::Utc>,
    ) -> TransitionResult<FSM::Output> {
        let from = self.current.clone();
        let (to, output) = self.current.transition(&input)?;

        self.history
            .push(Transition::new(from, to.clone(), input, timestamp));

        self.current = to;
        Ok(output)
    }

    pub fn get_history(&self) -> &[Transition<FSM, FSM::Input>] {
        &self.history
    }

    pub fn current_state(&self) -> &FSM {
        &self.current
    }

    pub fn into_history(self) -> Vec<Transition<FSM, FSM::Input>> {
        self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Gate {
        Closed,
        Open,
        Welded,
    }

    #[derive(Debug, Clone)]
    enum GateInput {
        Push,
        Weld,
    }

    impl StateMachine for Gate {
        type Input = GateInput;
        type Output = ();

        fn transition(&self, input: &Self::Input) -> TransitionResult<(Self, Self::Output)> {
            match (self, input) {
                (Gate::Welded, _) => Err(TransitionError::Terminal("Welded".into())),
                (Gate::Closed, GateInput::Push) => Ok((Gate::Open, ())),
                (Gate::Open, GateInput::Push) => Ok((Gate::Closed, ())),
                (Gate::Closed, GateInput::Weld) => Ok((Gate::Welded, ())),
                (from, input) => Err(TransitionError::InvalidTransition {
                    from: format!("{:?}", from),
                    input: format!("{:?}", input),
                }),
            }
        }
    }

    #[test]
    fn test_can_transition() {
        assert!(Gate::Closed.can_transition(&GateInput::Weld));
        assert!(!Gate::Open.can_transition(&GateInput::Weld));
    }

    #[test]
    fn test_history_records_accepted_transitions_only() {
        let mut fsm = StateMachineWithHistory::new(Gate::Closed);

        fsm.transition_with_history(GateInput::Push, Utc::now()).unwrap();
        assert!(fsm.transition_with_history(GateInput::Weld, Utc::now()).is_err());
        assert_eq!(*fsm.current_state(), Gate::Open);
        assert_eq!(fsm.get_history().len(), 1);

        fsm.transition_with_history(GateInput::Push, Utc::now()).unwrap();
        fsm.transition_with_history(GateInput::Weld, Utc::now()).unwrap();
        assert_eq!(*fsm.current_state(), Gate::Welded);
        assert_eq!(fsm.get_history().len(), 3);
        assert_eq!(
            fsm.transition_with_history(GateInput::Push, Utc::now()),
            Err(TransitionError::Terminal("Welded".into()))
        );
    }
}
