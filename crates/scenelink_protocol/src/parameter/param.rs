//! Observable typed parameters.
//!
//! Change notification is a subscription channel, not a callback: each
//! subscriber owns a `Receiver`, the parameter holds the `Sender`s. When a
//! parameter is dropped its senders go with it and every subscriber sees a
//! disconnected channel, so nothing can point at a destroyed object.

use std::any::Any;

use crossbeam_channel::{unbounded, Receiver, Sender};

use super::value::{ParameterData, ParameterType, ParameterValue};
use crate::error::ApplyError;

/// Scene-wide object id. Assigned from 1 in scene replay order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u16);

impl ObjectId {
    /// Reserved, never assigned.
    pub const NULL: Self = Self(0);

    /// True for the reserved id.
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parameter index within its owning object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParameterId(pub u16);

impl std::fmt::Display for ParameterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Notification published by [`Parameter::set`].
#[derive(Clone, Debug, PartialEq)]
pub struct ParameterChange {
    /// Owning object.
    pub object_id: ObjectId,
    /// Changed parameter.
    pub parameter_id: ParameterId,
    /// New value.
    pub value: ParameterValue,
}

/// A typed, observable value owned by a scene object.
#[derive(Debug)]
pub struct Parameter<T: ParameterData> {
    object_id: ObjectId,
    id: ParameterId,
    name: String,
    value: T,
    initial: T,
    distribute: bool,
    subscribers: Vec<Sender<ParameterChange>>,
}

impl<T: ParameterData> Parameter<T> {
    /// Creates a distributed parameter with no subscribers.
    #[must_use]
    pub fn new(object_id: ObjectId, id: ParameterId, name: impl Into<String>, value: T) -> Self {
        Self {
            object_id,
            id,
            name: name.into(),
            initial: value.clone(),
            value,
            distribute: true,
            subscribers: Vec::new(),
        }
    }

    /// Builder: keeps changes local (never forwarded to the network).
    #[must_use]
    pub fn local(mut self) -> Self {
        self.distribute = false;
        self
    }

    /// Current value.
    #[must_use]
    pub const fn value(&self) -> &T {
        &self.value
    }

    /// Value at creation, restored by [`Self::reset`].
    #[must_use]
    pub const fn initial(&self) -> &T {
        &self.initial
    }

    /// Sets the value and notifies every subscriber.
    pub fn set(&mut self, value: T) {
        self.value = value;
        self.notify();
    }

    /// Sets the value without notifying. Used for remote updates, so an
    /// applied update never echoes back onto the network.
    pub fn set_silent(&mut self, value: T) {
        self.value = value;
    }

    /// Restores the initial value and notifies.
    pub fn reset(&mut self) {
        self.set(self.initial.clone());
    }

    /// Opens a new subscription.
    pub fn subscribe(&mut self) -> Receiver<ParameterChange> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Adds an existing channel as a subscriber.
    pub fn subscribe_with(&mut self, tx: Sender<ParameterChange>) {
        self.subscribers.push(tx);
    }

    /// Live subscriber count.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    fn notify(&mut self) {
        if self.subscribers.is_empty() {
            return;
        }
        let change = ParameterChange {
            object_id: self.object_id,
            parameter_id: self.id,
            value: self.value.clone().into_value(),
        };
        // Drop subscribers whose receiver is gone.
        self.subscribers.retain(|tx| tx.send(change.clone()).is_ok());
    }
}

/// Object-safe view of a [`Parameter`] of any type.
pub trait AbstractParameter: std::fmt::Debug + Send {
    /// Parameter id.
    fn id(&self) -> ParameterId;
    /// Display name.
    fn name(&self) -> &str;
    /// Wire type.
    fn parameter_type(&self) -> ParameterType;
    /// Current value.
    fn value(&self) -> ParameterValue;
    /// Whether changes go to the network.
    fn is_distributed(&self) -> bool;
    /// Local edit: sets and notifies.
    ///
    /// # Errors
    ///
    /// [`ApplyError::TypeMismatch`] if `value` has another type.
    fn set_value(&mut self, value: ParameterValue) -> Result<(), ApplyError>;
    /// Remote update: sets without notifying.
    ///
    /// # Errors
    ///
    /// [`ApplyError::TypeMismatch`] if `value` has another type.
    fn apply_silent(&mut self, value: ParameterValue) -> Result<(), ApplyError>;
    /// Restores the initial value without notifying.
    fn reset_silent(&mut self);
    /// Adds a subscriber channel.
    fn subscribe_with(&mut self, tx: Sender<ParameterChange>);
    /// Downcast support.
    fn as_any(&self) -> &dyn Any;
    /// Downcast support.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: ParameterData> Parameter<T> {
    fn typed(&self, value: ParameterValue) -> Result<T, ApplyError> {
        let actual = value.parameter_type() as u8;
        T::from_value(value).ok_or(ApplyError::TypeMismatch {
            parameter: self.id.0,
            expected: T::TYPE as u8,
            actual,
        })
    }
}

impl<T: ParameterData> AbstractParameter for Parameter<T> {
    fn id(&self) -> ParameterId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn parameter_type(&self) -> ParameterType {
        T::TYPE
    }

    fn value(&self) -> ParameterValue {
        self.value.clone().into_value()
    }

    fn is_distributed(&self) -> bool {
        self.distribute
    }

    fn set_value(&mut self, value: ParameterValue) -> Result<(), ApplyError> {
        let value = self.typed(value)?;
        self.set(value);
        Ok(())
    }

    fn apply_silent(&mut self, value: ParameterValue) -> Result<(), ApplyError> {
        let value = self.typed(value)?;
        self.set_silent(value);
        Ok(())
    }

    fn reset_silent(&mut self) {
        self.value = self.initial.clone();
    }

    fn subscribe_with(&mut self, tx: Sender<ParameterChange>) {
        Parameter::subscribe_with(self, tx);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
