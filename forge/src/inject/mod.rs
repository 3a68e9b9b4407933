//! [`Injectable`] values separate the value computed by the protocol logic from the value which
//! is actually written to the wire.
//!
//! Handlers always store the protocol-correct value with [`Injectable::set_original`]. A test
//! driver may attach a chain of [`Modification`]s to any field before the message is prepared;
//! the chain is applied when the handler reads the value for output, so exactly one field of an
//! otherwise correct message can be corrupted without touching any handler.

use std::fmt;

use itertools::Itertools;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub mod field;
pub mod modification;

pub use field::FieldMut;
pub use modification::{
    AnyModification, ByteModification, BytesModification, IntegerModification, Modification,
};

/// Value kinds which can be held by an [`Injectable`]
pub trait Modifiable:
    fmt::Debug + Clone + Default + PartialEq + Serialize + DeserializeOwned
{
    type Modification: Modification<Self>;
}

impl Modifiable for u8 {
    type Modification = ByteModification;
}

impl Modifiable for u32 {
    type Modification = IntegerModification;
}

impl Modifiable for Vec<u8> {
    type Modification = BytesModification;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Injectable<T: Modifiable> {
    original: Option<T>,
    chain: Vec<T::Modification>,
    post: Option<T::Modification>,
}

pub type InjectableByte = Injectable<u8>;
pub type InjectableInteger = Injectable<u32>;
pub type InjectableBytes = Injectable<Vec<u8>>;

impl<T: Modifiable> Default for Injectable<T> {
    fn default() -> Self {
        Self {
            original: None,
            chain: Vec::new(),
            post: None,
        }
    }
}

impl<T: Modifiable> Injectable<T> {
    /// An uninitialized value. Reading it yields `T::default()` run through the chain.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_original(original: T) -> Self {
        Self {
            original: Some(original),
            ..Self::default()
        }
    }

    /// Store the protocol-correct value. An attached chain stays attached.
    pub fn set_original(&mut self, original: T) {
        self.original = Some(original);
    }

    pub fn original(&self) -> Option<&T> {
        self.original.as_ref()
    }

    pub fn is_set(&self) -> bool {
        self.original.is_some()
    }

    /// The value as it goes on the wire: the chain folded over the original, then the post step.
    pub fn value(&self) -> T {
        let base = self.original.clone().unwrap_or_default();
        let modified = self.chain.iter().fold(base, |acc, m| m.modify(acc));
        match &self.post {
            Some(post) => post.modify(modified),
            None => modified,
        }
    }

    /// Replace the transformation chain
    pub fn attach(&mut self, chain: Vec<T::Modification>) {
        self.chain = chain;
    }

    /// Append one step to the end of the chain
    pub fn push(&mut self, modification: T::Modification) {
        self.chain.push(modification);
    }

    pub fn set_post(&mut self, post: Option<T::Modification>) {
        self.post = post;
    }

    /// Remove chain and post step, restoring pass-through behavior
    pub fn detach(&mut self) {
        self.chain.clear();
        self.post = None;
    }

    pub fn chain(&self) -> &[T::Modification] {
        &self.chain
    }

    pub fn post(&self) -> Option<&T::Modification> {
        self.post.as_ref()
    }

    pub fn is_injected(&self) -> bool {
        !self.chain.is_empty() || self.post.is_some()
    }

    /// Whether the wire value differs from the original
    pub fn is_modified(&self) -> bool {
        self.is_injected() && self.original.as_ref() != Some(&self.value())
    }
}

impl<T: Modifiable> From<T> for Injectable<T> {
    fn from(original: T) -> Self {
        Self::with_original(original)
    }
}

impl<T: Modifiable> fmt::Display for Injectable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.value())?;
        if self.is_injected() {
            write!(f, " (original {:?}", self.original)?;
            if !self.chain.is_empty() {
                write!(f, ", chain [{}]", self.chain.iter().join(", "))?;
            }
            if let Some(post) = &self.post {
                write!(f, ", post {}", post)?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}
