//! Capability probing.
//!
//! Wrapping types (the pooled data source, connection proxies) let callers
//! reach the concrete objects they wrap. A probe for type `T` walks a chain
//! of candidates and returns the first whose concrete type is `T`:
//!
//! ```text
//! probe::<T>(wrapper)
//!   ├─ wrapper's own candidates (e.g. the backing source, the pool)
//!   └─ the wrapped object's own probe chain
//! ```
//!
//! Types are requested statically, so a "null" request cannot be expressed.

use std::any::{type_name, Any, TypeId};

use crate::common::{Error, Result};

/// Upcast to [`Any`], plus the concrete type name for diagnostics.
///
/// Blanket-implemented for every `'static` type; a supertrait of
/// [`Connection`](super::Connection) and [`DataSource`](super::DataSource).
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn concrete_type_name(&self) -> &'static str;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn concrete_type_name(&self) -> &'static str {
        type_name::<T>()
    }
}

/// First candidate whose concrete type is `ty`.
pub(crate) fn first_match<'a, I>(ty: TypeId, candidates: I) -> Option<&'a dyn Any>
where
    I: IntoIterator<Item = &'a dyn Any>,
{
    candidates
        .into_iter()
        .find(|candidate| Any::type_id(*candidate) == ty)
}

/// Turn a probe result into `&T`.
///
/// # Errors
/// `Error::NotWrapped` naming `T` if the probe found nothing.
pub(crate) fn downcast<T: Any>(found: Option<&dyn Any>) -> Result<&T> {
    found
        .and_then(|any| any.downcast_ref::<T>())
        .ok_or(Error::NotWrapped(type_name::<T>()))
}
