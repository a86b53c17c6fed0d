use std::fmt;
#[cfg(debug_assertions)]
use std::{
    collections::HashMap,
    sync::{Mutex, OnceLock},
};

/// Interned name of an attachment, image or pass.
///
/// Names are compared by their hash, so two names built from the same string are equal no
/// matter where they were created. Construction is `const`, which lets passes and attachments
/// be declared up front:
///
/// ```
/// use lazy_render_graph::AttachmentName;
///
/// const ALBEDO: AttachmentName = AttachmentName::new("albedo");
/// assert_eq!(ALBEDO, AttachmentName::from("albedo"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct AttachmentName(u64);

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

impl AttachmentName {
    /// The "no attachment" name. Depth attachments that were never set carry this name.
    pub const EMPTY: AttachmentName = AttachmentName(0);

    pub const fn new(name: &str) -> Self {
        let bytes = name.as_bytes();
        if bytes.is_empty() {
            return Self::EMPTY;
        }

        let mut hash = FNV_OFFSET;
        let mut i = 0;
        while i < bytes.len() {
            hash ^= bytes[i] as u64;
            hash = hash.wrapping_mul(FNV_PRIME);
            i += 1;
        }

        // 0 is reserved for EMPTY
        if hash == 0 {
            hash = FNV_OFFSET;
        }

        AttachmentName(hash)
    }

    pub const fn from_raw(id: u64) -> Self {
        AttachmentName(id)
    }

    pub const fn as_raw(self) -> u64 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Strings behind the names created at runtime, so debug builds can print them.
#[cfg(debug_assertions)]
fn known_names() -> &'static Mutex<HashMap<u64, Box<str>>> {
    static NAMES: OnceLock<Mutex<HashMap<u64, Box<str>>>> = OnceLock::new();
    NAMES.get_or_init(Default::default)
}

impl AttachmentName {
    /// Same as [`AttachmentName::new`]. In debug builds the string is remembered, and
    /// `Display` (and with it every [`crate::GraphError`] message) prints it instead of the
    /// hash.
    pub fn named(name: &str) -> Self {
        let id = Self::new(name);

        #[cfg(debug_assertions)]
        if !id.is_empty() {
            if let Ok(mut names) = known_names().lock() {
                names.entry(id.0).or_insert_with(|| name.into());
            }
        }

        id
    }

    #[cfg(debug_assertions)]
    fn known_name(self) -> Option<Box<str>> {
        known_names().lock().ok()?.get(&self.0).cloned()
    }

    #[cfg(not(debug_assertions))]
    fn known_name(self) -> Option<Box<str>> {
        None
    }
}

impl From<&str> for AttachmentName {
    fn from(name: &str) -> Self {
        AttachmentName::named(name)
    }
}

impl fmt::Display for AttachmentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "<empty>");
        }
        match self.known_name() {
            Some(name) => write!(f, "\"{name}\""),
            None => write!(f, "#{:016x}", self.0),
        }
    }
}
