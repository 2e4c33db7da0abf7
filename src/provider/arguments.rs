//! Resolved constructor arguments.

use std::sync::Arc;

use smallvec::SmallVec;

use crate::error::{DiError, DiResult};
use crate::key::Key;
use super::{downcast, AnyArc};

/// One resolved position: the identifier it asked for and the value found.
#[derive(Clone)]
pub(crate) struct Slot {
    pub(crate) target: Option<Key>,
    pub(crate) value: Option<AnyArc>,
}

/// Values resolved for a constructor's parameters or a factory's dependencies,
/// in declaration order.
///
/// Optional positions whose identifier had no provider hold nothing.
///
/// # Examples
///
/// ```rust
/// use ferrous_injector::Arguments;
/// use std::sync::Arc;
///
/// let args = Arguments::from_values(vec![Some(Arc::new(7u32) as _), None]);
/// assert_eq!(*args.required::<u32>(0).unwrap(), 7);
/// assert!(args.optional::<String>(1).unwrap().is_none());
/// assert!(args.required::<String>(1).is_err());
/// ```
#[derive(Clone, Default)]
pub struct Arguments {
    slots: SmallVec<[Slot; 4]>,
}

impl Arguments {
    /// No arguments.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds arguments from raw values, mostly useful when testing a
    /// constructor or factory in isolation.
    pub fn from_values(values: Vec<Option<AnyArc>>) -> Self {
        Self {
            slots: values.into_iter().map(|value| Slot { target: None, value }).collect(),
        }
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: SmallVec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, target: Option<Key>, value: Option<AnyArc>) {
        self.slots.push(Slot { target, value });
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The value at `index`, failing with `MissingDependency` when absent.
    pub fn required<T: Send + Sync + 'static>(&self, index: usize) -> DiResult<Arc<T>> {
        match self.optional::<T>(index)? {
            Some(value) => Ok(value),
            None => Err(DiError::MissingDependency {
                target: self.describe(index),
                position: index,
            }),
        }
    }

    /// The value at `index`, or `None` when the position resolved to nothing.
    pub fn optional<T: Send + Sync + 'static>(&self, index: usize) -> DiResult<Option<Arc<T>>> {
        let Some(slot) = self.slots.get(index) else {
            return Ok(None);
        };
        match &slot.value {
            Some(value) => {
                let key = slot
                    .target
                    .clone()
                    .unwrap_or_else(|| crate::key::key_of_type::<T>());
                downcast::<T>(value.clone(), &key).map(Some)
            }
            None => Ok(None),
        }
    }

    /// The erased value at `index`.
    pub fn raw(&self, index: usize) -> Option<&AnyArc> {
        self.slots.get(index).and_then(|slot| slot.value.as_ref())
    }

    fn describe(&self, index: usize) -> String {
        match self.slots.get(index).and_then(|slot| slot.target.as_ref()) {
            Some(key) => key.to_string(),
            None => "<no identifier>".to_string(),
        }
    }
}

impl std::fmt::Debug for Arguments {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.slots.iter().map(|slot| {
                (
                    slot.target.as_ref().map(|k| k.to_string()),
                    slot.value.is_some(),
                )
            }))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::key_of_type;

    #[test]
    fn missing_required_names_target() {
        let mut args = Arguments::with_capacity(1);
        args.push(Some(key_of_type::<String>()), None);

        match args.required::<String>(0) {
            Err(DiError::MissingDependency { target, position }) => {
                assert_eq!(position, 0);
                assert!(target.contains("String"));
            }
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn out_of_range_is_absent() {
        let args = Arguments::empty();
        assert!(args.is_empty());
        assert!(args.optional::<u8>(3).unwrap().is_none());
        assert!(args.raw(0).is_none());
    }

    #[test]
    fn wrong_type_is_mismatch() {
        let args = Arguments::from_values(vec![Some(Arc::new(1u8) as AnyArc)]);
        assert!(matches!(args.required::<u16>(0), Err(DiError::TypeMismatch { .. })));
    }
}
