//! Named values found in the DOS, COFF and optional headers.

use core::fmt;

/// The `MZ` signature at the start of every DOS header.
pub const DOS_SIGNATURE: u16 = 0x5A4D;
/// The `PE\0\0` signature at the start of the NT headers.
pub const PE_SIGNATURE: u32 = 0x0000_4550;
/// The size, in bytes, of the `PE\0\0` signature.
pub const PE_SIGNATURE_SIZE: u32 = 4;

/// The machine type an image targets.
#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Machine(pub u16);

impl Machine {
    /// The image may run on any machine.
    pub const UNKNOWN: Self = Self(0);
    /// Intel 386 or later.
    pub const I386: Self = Self(0x014C);
    /// AMD64 (x86_64).
    pub const AMD64: Self = Self(0x8664);
    /// Intel Itanium.
    pub const IA64: Self = Self(0x0200);
    /// ARM little-endian.
    pub const ARM: Self = Self(0x01C0);
    /// ARM Thumb-2 little-endian.
    pub const ARMNT: Self = Self(0x01C4);
    /// ARM64 little-endian.
    pub const ARM64: Self = Self(0xAA64);
}

impl fmt::Debug for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::UNKNOWN => f.pad("Unknown"),
            Self::I386 => f.pad("I386"),
            Self::AMD64 => f.pad("Amd64"),
            Self::IA64 => f.pad("Ia64"),
            Self::ARM => f.pad("Arm"),
            Self::ARMNT => f.pad("ArmNt"),
            Self::ARM64 => f.pad("Arm64"),
            machine => f.debug_tuple("Machine").field(&machine.0).finish(),
        }
    }
}

/// The subsystem required to run an image.
#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Subsystem(pub u16);

impl Subsystem {
    /// Unknown subsystem.
    pub const UNKNOWN: Self = Self(0);
    /// Device drivers and native processes.
    pub const NATIVE: Self = Self(1);
    /// Windows graphical user interface.
    pub const WINDOWS_GUI: Self = Self(2);
    /// Windows character subsystem.
    pub const WINDOWS_CUI: Self = Self(3);
    /// OS/2 character subsystem.
    pub const OS2_CUI: Self = Self(5);
    /// POSIX character subsystem.
    pub const POSIX_CUI: Self = Self(7);
    /// Native Win9x driver.
    pub const NATIVE_WINDOWS: Self = Self(8);
    /// Windows CE.
    pub const WINDOWS_CE_GUI: Self = Self(9);
    /// Extensible Firmware Interface application.
    pub const EFI_APPLICATION: Self = Self(10);
    /// EFI driver with boot services.
    pub const EFI_BOOT_SERVICE_DRIVER: Self = Self(11);
    /// EFI driver with run-time services.
    pub const EFI_RUNTIME_DRIVER: Self = Self(12);
    /// EFI ROM image.
    pub const EFI_ROM: Self = Self(13);
    /// XBOX.
    pub const XBOX: Self = Self(14);
    /// Windows boot application.
    pub const WINDOWS_BOOT_APPLICATION: Self = Self(16);
}

impl fmt::Debug for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::UNKNOWN => f.pad("Unknown"),
            Self::NATIVE => f.pad("Native"),
            Self::WINDOWS_GUI => f.pad("WindowsGui"),
            Self::WINDOWS_CUI => f.pad("WindowsCui"),
            Self::OS2_CUI => f.pad("Os2Cui"),
            Self::POSIX_CUI => f.pad("PosixCui"),
            Self::NATIVE_WINDOWS => f.pad("NativeWindows"),
            Self::WINDOWS_CE_GUI => f.pad("WindowsCeGui"),
            Self::EFI_APPLICATION => f.pad("EfiApplication"),
            Self::EFI_BOOT_SERVICE_DRIVER => f.pad("EfiBootServiceDriver"),
            Self::EFI_RUNTIME_DRIVER => f.pad("EfiRuntimeDriver"),
            Self::EFI_ROM => f.pad("EfiRom"),
            Self::XBOX => f.pad("Xbox"),
            Self::WINDOWS_BOOT_APPLICATION => f.pad("WindowsBootApplication"),
            subsystem => f.debug_tuple("Subsystem").field(&subsystem.0).finish(),
        }
    }
}

/// Generates a bit flag newtype with associated constants and a [`fmt::Debug`] implementation
/// that lists the set flags by name.
macro_rules! flags {
    (
        $(#[$meta:meta])*
        $name:ident($kind:ty) {
            $( $(#[$flag_meta:meta])* $flag:ident = $value:expr, )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Default, Hash, PartialEq, Eq)]
        pub struct $name(pub $kind);

        impl $name {
            $( $(#[$flag_meta])* pub const $flag: Self = Self($value); )*

            /// Returns `true` if every bit of `other` is set in `self`.
            pub const fn contains(self, other: Self) -> bool {
                self.0 & other.0 == other.0
            }
        }

        impl core::ops::BitOr for $name {
            type Output = Self;

            fn bitor(self, rhs: Self) -> Self {
                Self(self.0 | rhs.0)
            }
        }

        impl core::fmt::Debug for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                let mut list = f.debug_set();
                let mut remaining = self.0;
                $(
                    if Self::$flag.0 != 0 && self.contains(Self::$flag) {
                        list.entry(&format_args!(stringify!($flag)));
                        remaining &= !Self::$flag.0;
                    }
                )*
                if remaining != 0 {
                    list.entry(&format_args!("{remaining:#x}"));
                }
                list.finish()
            }
        }
    };
}

pub(crate) use flags;

flags! {
    /// Attributes of an image recorded in the COFF file header.
    FileCharacteristics(u16) {
        /// Base relocations have been removed.
        RELOCS_STRIPPED = 0x0001,
        /// The image is valid and can be run.
        EXECUTABLE_IMAGE = 0x0002,
        /// COFF line numbers have been removed.
        LINE_NUMS_STRIPPED = 0x0004,
        /// COFF local symbols have been removed.
        LOCAL_SYMS_STRIPPED = 0x0008,
        /// The application can handle addresses above 2 GB.
        LARGE_ADDRESS_AWARE = 0x0020,
        /// The machine is based on a 32-bit word architecture.
        MACHINE_32BIT = 0x0100,
        /// Debugging information has been removed.
        DEBUG_STRIPPED = 0x0200,
        /// Copy to swap if run from removable media.
        REMOVABLE_RUN_FROM_SWAP = 0x0400,
        /// Copy to swap if run from network media.
        NET_RUN_FROM_SWAP = 0x0800,
        /// The image is a system file.
        SYSTEM = 0x1000,
        /// The image is a dynamic-link library.
        DLL = 0x2000,
        /// The image should only run on a uniprocessor machine.
        UP_SYSTEM_ONLY = 0x4000,
    }
}

flags! {
    /// Loader attributes of an image recorded in the optional header.
    DllCharacteristics(u16) {
        /// The image can handle a high entropy 64-bit address space.
        HIGH_ENTROPY_VA = 0x0020,
        /// The image can be relocated at load time.
        DYNAMIC_BASE = 0x0040,
        /// Code integrity checks are enforced.
        FORCE_INTEGRITY = 0x0080,
        /// The image is compatible with data execution prevention.
        NX_COMPAT = 0x0100,
        /// The image is isolation aware but should not be isolated.
        NO_ISOLATION = 0x0200,
        /// The image does not use structured exception handling.
        NO_SEH = 0x0400,
        /// The image should not be bound.
        NO_BIND = 0x0800,
        /// The image must execute in an AppContainer.
        APPCONTAINER = 0x1000,
        /// The image is a WDM driver.
        WDM_DRIVER = 0x2000,
        /// The image supports control flow guard.
        GUARD_CF = 0x4000,
        /// The image is terminal server aware.
        TERMINAL_SERVER_AWARE = 0x8000,
    }
}

#[cfg(test)]
mod test {
    use alloc::format;

    use super::{DllCharacteristics, FileCharacteristics, Machine, Subsystem};

    #[test]
    fn known_values_print_names() {
        assert_eq!(format!("{:?}", Machine::AMD64), "Amd64");
        assert_eq!(format!("{:?}", Machine(0x1234)), "Machine(4660)");
        assert_eq!(format!("{:?}", Subsystem::WINDOWS_CUI), "WindowsCui");
    }

    #[test]
    fn flags_list_set_bits() {
        let flags = FileCharacteristics::EXECUTABLE_IMAGE | FileCharacteristics::DLL;

        assert!(flags.contains(FileCharacteristics::DLL));
        assert!(!flags.contains(FileCharacteristics::SYSTEM));
        assert_eq!(format!("{flags:?}"), "{EXECUTABLE_IMAGE, DLL}");
        assert_eq!(
            format!("{:?}", DllCharacteristics(0x0140 | 0x0001)),
            "{DYNAMIC_BASE, NX_COMPAT, 0x1}"
        );
    }
}
