//! Canonical byte form of stream items.
//!
//! Every item is hashed through its textual form, UTF-8 encoded. Two items are
//! considered equal by the sketches exactly when their canonical bytes are equal,
//! so `"42"` and `42u32` land on the same slots and buckets.
//!
//! Values that have no textual form (byte strings or OS strings holding invalid
//! UTF-8) are rejected with [`SketchError::UnencodableItem`] instead of being
//! silently skipped; the caller decides whether to drop or abort.

use std::borrow::Cow;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use crate::error::{Result, SketchError};

/// Conversion of an item into the bytes that get hashed.
pub trait CanonicalBytes {
    /// Return canonical UTF-8 bytes of the item
    fn canonical_bytes(&self) -> Result<Cow<'_, [u8]>>;
}

impl CanonicalBytes for str {
    #[inline]
    fn canonical_bytes(&self) -> Result<Cow<'_, [u8]>> {
        Ok(Cow::Borrowed(self.as_bytes()))
    }
}

impl CanonicalBytes for String {
    #[inline]
    fn canonical_bytes(&self) -> Result<Cow<'_, [u8]>> {
        self.as_str().canonical_bytes()
    }
}

impl CanonicalBytes for Cow<'_, str> {
    #[inline]
    fn canonical_bytes(&self) -> Result<Cow<'_, [u8]>> {
        self.as_ref().canonical_bytes()
    }
}

impl CanonicalBytes for [u8] {
    #[inline]
    fn canonical_bytes(&self) -> Result<Cow<'_, [u8]>> {
        match std::str::from_utf8(self) {
            Ok(_) => Ok(Cow::Borrowed(self)),
            Err(e) => Err(SketchError::unencodable(e.to_string())),
        }
    }
}

impl CanonicalBytes for Vec<u8> {
    #[inline]
    fn canonical_bytes(&self) -> Result<Cow<'_, [u8]>> {
        self.as_slice().canonical_bytes()
    }
}

impl CanonicalBytes for OsStr {
    #[inline]
    fn canonical_bytes(&self) -> Result<Cow<'_, [u8]>> {
        match self.to_str() {
            Some(s) => s.canonical_bytes(),
            None => Err(SketchError::unencodable(format!(
                "{:?} is not valid unicode",
                self
            ))),
        }
    }
}

impl CanonicalBytes for OsString {
    #[inline]
    fn canonical_bytes(&self) -> Result<Cow<'_, [u8]>> {
        self.as_os_str().canonical_bytes()
    }
}

impl CanonicalBytes for Path {
    #[inline]
    fn canonical_bytes(&self) -> Result<Cow<'_, [u8]>> {
        self.as_os_str().canonical_bytes()
    }
}

impl CanonicalBytes for PathBuf {
    #[inline]
    fn canonical_bytes(&self) -> Result<Cow<'_, [u8]>> {
        self.as_os_str().canonical_bytes()
    }
}

impl<T: CanonicalBytes + ?Sized> CanonicalBytes for &T {
    #[inline]
    fn canonical_bytes(&self) -> Result<Cow<'_, [u8]>> {
        (**self).canonical_bytes()
    }
}

impl<T: CanonicalBytes + ?Sized> CanonicalBytes for Box<T> {
    #[inline]
    fn canonical_bytes(&self) -> Result<Cow<'_, [u8]>> {
        (**self).canonical_bytes()
    }
}

/// Scalars are hashed through their `Display` form.
macro_rules! display_canonical_bytes {
    ($($t:ty),* $(,)?) => {
        $(
            impl CanonicalBytes for $t {
                #[inline]
                fn canonical_bytes(&self) -> Result<Cow<'_, [u8]>> {
                    Ok(Cow::Owned(self.to_string().into_bytes()))
                }
            }
        )*
    };
}

display_canonical_bytes!(
    u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64, bool, char,
);
