//! Runtime identity of a value.
//!
//! Only values with reference semantics have an identity: the address of the
//! heap allocation they point at. Two structurally equal values that live in
//! different allocations have different identities, and a value type has
//! none at all.

use std::mem;
use std::rc::Rc;
use std::sync::Arc;

/// Capability check for identity-keyed caching.
///
/// Returns the stable address backing `self`, or `None` when the value has
/// no reference identity (plain values, empty or zero-sized allocations).
pub trait Identity {
    fn identity(&self) -> Option<usize>;
}

impl<T: ?Sized> Identity for Arc<T> {
    fn identity(&self) -> Option<usize> {
        // ArcInner always allocates the counters, even for zero-sized T.
        Some(Arc::as_ptr(self).cast::<()>() as usize)
    }
}

impl<T: ?Sized> Identity for Rc<T> {
    fn identity(&self) -> Option<usize> {
        Some(Rc::as_ptr(self).cast::<()>() as usize)
    }
}

impl<T: ?Sized> Identity for Box<T> {
    fn identity(&self) -> Option<usize> {
        // A boxed ZST is a dangling pointer shared by every such box.
        if mem::size_of_val(&**self) == 0 {
            return None;
        }
        Some((&**self as *const T).cast::<()>() as usize)
    }
}

impl<T> Identity for Vec<T> {
    fn identity(&self) -> Option<usize> {
        if self.capacity() == 0 || mem::size_of::<T>() == 0 {
            return None;
        }
        Some(self.as_ptr() as usize)
    }
}

macro_rules! no_identity {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Identity for $ty {
                fn identity(&self) -> Option<usize> { None }
            }
        )*
    };
}

no_identity!(
    (), bool, char,
    u8, u16, u32, u64, u128, usize,
    i8, i16, i32, i64, i128, isize,
    f32, f64,
    String,
);
