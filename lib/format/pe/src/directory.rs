//! Identification of the data directories of the optional header.

use core::fmt;

/// The number of data directory slots an optional header can hold.
pub const NUMBER_OF_DIRECTORIES: u32 = 16;

/// The index of a data directory in the optional header.
#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct DirectoryId(pub u32);

impl DirectoryId {
    /// Export table.
    pub const EXPORT: Self = Self(0);
    /// Import table.
    pub const IMPORT: Self = Self(1);
    /// Resource table.
    pub const RESOURCE: Self = Self(2);
    /// Exception table.
    pub const EXCEPTION: Self = Self(3);
    /// Attribute certificate table. Its address is a file offset rather than an RVA.
    pub const SECURITY: Self = Self(4);
    /// Base relocation table.
    pub const BASE_RELOCATION: Self = Self(5);
    /// Debug data.
    pub const DEBUG: Self = Self(6);
    /// Architecture specific data.
    pub const ARCHITECTURE: Self = Self(7);
    /// Global pointer register value.
    pub const GLOBAL_PTR: Self = Self(8);
    /// Thread local storage table.
    pub const TLS: Self = Self(9);
    /// Load configuration table.
    pub const LOAD_CONFIG: Self = Self(10);
    /// Bound import table.
    pub const BOUND_IMPORT: Self = Self(11);
    /// Import address table.
    pub const IAT: Self = Self(12);
    /// Delay import descriptor.
    pub const DELAY_IMPORT: Self = Self(13);
    /// CLR runtime header.
    pub const COM_DESCRIPTOR: Self = Self(14);

    /// Every named directory, in slot order.
    pub const ALL: [Self; 15] = [
        Self::EXPORT,
        Self::IMPORT,
        Self::RESOURCE,
        Self::EXCEPTION,
        Self::SECURITY,
        Self::BASE_RELOCATION,
        Self::DEBUG,
        Self::ARCHITECTURE,
        Self::GLOBAL_PTR,
        Self::TLS,
        Self::LOAD_CONFIG,
        Self::BOUND_IMPORT,
        Self::IAT,
        Self::DELAY_IMPORT,
        Self::COM_DESCRIPTOR,
    ];
}

impl fmt::Debug for DirectoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::EXPORT => f.pad("Export"),
            Self::IMPORT => f.pad("Import"),
            Self::RESOURCE => f.pad("Resource"),
            Self::EXCEPTION => f.pad("Exception"),
            Self::SECURITY => f.pad("Security"),
            Self::BASE_RELOCATION => f.pad("BaseRelocation"),
            Self::DEBUG => f.pad("Debug"),
            Self::ARCHITECTURE => f.pad("Architecture"),
            Self::GLOBAL_PTR => f.pad("GlobalPtr"),
            Self::TLS => f.pad("Tls"),
            Self::LOAD_CONFIG => f.pad("LoadConfig"),
            Self::BOUND_IMPORT => f.pad("BoundImport"),
            Self::IAT => f.pad("Iat"),
            Self::DELAY_IMPORT => f.pad("DelayImport"),
            Self::COM_DESCRIPTOR => f.pad("ComDescriptor"),
            id => f.debug_tuple("DirectoryId").field(&id.0).finish(),
        }
    }
}
