//! Readiness state for the two asynchronous acquisition steps.
//!
//! Camera access and model load run as independent init tasks and deliver
//! their handle through a oneshot channel. A [`Slot`] tracks one such
//! handle: it starts `Pending`, transitions at most once to `Ready` or
//! `Failed`, and never reverts.
use std::fmt;

use tokio::sync::oneshot::{self, error::TryRecvError};

/// The two gated prerequisites of a detection cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Camera,
    Model,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::Camera => write!(f, "camera"),
            Component::Model => write!(f, "model"),
        }
    }
}

/// Terminal failure of an acquisition step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitError {
    Camera(String),
    Model(String),
}

impl InitError {
    pub fn for_component(component: Component, reason: impl Into<String>) -> Self {
        match component {
            Component::Camera => InitError::Camera(reason.into()),
            Component::Model => InitError::Model(reason.into()),
        }
    }

    pub fn component(&self) -> Component {
        match self {
            InitError::Camera(_) => Component::Camera,
            InitError::Model(_) => Component::Model,
        }
    }
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitError::Camera(reason) => write!(f, "camera init failed: {}", reason),
            InitError::Model(reason) => write!(f, "model init failed: {}", reason),
        }
    }
}

impl std::error::Error for InitError {}

/// Session status as surfaced to the presentation sink.
///
/// `Failed` is terminal for the component it names; the loop itself keeps
/// running and skipping detection, it does not tear the session down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    Initializing,
    Running,
    Failed(InitError),
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Initializing => write!(f, "initializing"),
            SessionStatus::Running => write!(f, "running"),
            SessionStatus::Failed(err) => write!(f, "failed: {}", err),
        }
    }
}

/// Event reported by [`Slot::poll`] when the slot changes state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotEvent {
    BecameReady,
    BecameFailed(InitError),
}

enum SlotState<T> {
    Pending(oneshot::Receiver<Result<T, InitError>>),
    Ready(T),
    Failed(InitError),
}

/// One-shot readiness slot for an asynchronously acquired handle.
pub struct Slot<T> {
    component: Component,
    state: SlotState<T>,
}

impl<T> Slot<T> {
    /// Slot waiting on an init task.
    pub fn pending(component: Component, rx: oneshot::Receiver<Result<T, InitError>>) -> Self {
        Self {
            component,
            state: SlotState::Pending(rx),
        }
    }

    /// Slot that is ready from the start.
    pub fn ready(component: Component, value: T) -> Self {
        Self {
            component,
            state: SlotState::Ready(value),
        }
    }

    /// Check the init channel without blocking.
    ///
    /// Returns the transition if the slot moved out of `Pending`. A dropped
    /// init task counts as a failure.
    pub fn poll(&mut self) -> Option<SlotEvent> {
        let SlotState::Pending(rx) = &mut self.state else {
            return None;
        };

        match rx.try_recv() {
            Ok(Ok(value)) => {
                self.state = SlotState::Ready(value);
                Some(SlotEvent::BecameReady)
            }
            Ok(Err(err)) => {
                self.state = SlotState::Failed(err.clone());
                Some(SlotEvent::BecameFailed(err))
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => {
                let err = InitError::for_component(self.component, "init task dropped");
                self.state = SlotState::Failed(err.clone());
                Some(SlotEvent::BecameFailed(err))
            }
        }
    }

    pub fn component(&self) -> Component {
        self.component
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, SlotState::Ready(_))
    }

    pub fn get_mut(&mut self) -> Option<&mut T> {
        match &mut self.state {
            SlotState::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn get(&self) -> Option<&T> {
        match &self.state {
            SlotState::Ready(value) => Some(value),
            _ => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn pending_slot_becomes_ready_once() {
        let (tx, rx) = oneshot::channel();
        let mut slot: Slot<u32> = Slot::pending(Component::Camera, rx);

        assert!(slot.poll().is_none());
        assert!(!slot.is_ready());

        tx.send(Ok(7)).unwrap();
        assert_eq!(slot.poll(), Some(SlotEvent::BecameReady));
        assert!(slot.is_ready());
        assert_eq!(slot.get(), Some(&7));

        // Ready is sticky, further polls are no-ops.
        assert!(slot.poll().is_none());
        assert!(slot.is_ready());
    }

    #[test]
    fn init_error_marks_slot_failed() {
        let (tx, rx) = oneshot::channel();
        let mut slot: Slot<u32> = Slot::pending(Component::Model, rx);

        tx.send(Err(InitError::Model("weights missing".into())))
            .unwrap();
        match slot.poll() {
            Some(SlotEvent::BecameFailed(InitError::Model(reason))) => {
                assert_eq!(reason, "weights missing");
            }
            other => panic!("unexpected transition: {:?}", other),
        }
        assert!(!slot.is_ready());
        assert!(slot.poll().is_none());
    }

    #[test]
    fn dropped_init_task_marks_slot_failed() {
        let (tx, rx) = oneshot::channel::<Result<u32, InitError>>();
        let mut slot = Slot::pending(Component::Camera, rx);
        drop(tx);

        match slot.poll() {
            Some(SlotEvent::BecameFailed(err)) => {
                assert_eq!(err.component(), Component::Camera);
            }
            other => panic!("unexpected transition: {:?}", other),
        }
    }

    #[test]
    fn ready_slot_needs_no_polling() {
        let mut slot = Slot::ready(Component::Camera, "handle");
        assert!(slot.is_ready());
        assert!(slot.poll().is_none());
        assert_eq!(slot.get_mut(), Some(&mut "handle"));
    }
}
