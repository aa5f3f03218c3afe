//! The `pe` crate provides an interface for loading and inspecting PE32 and PE32+ images.
//!
//! # Capabilities
//!
//! ## Works in `no_std` environments
//!
//! This crate only requires `alloc`, so it can be used in `no_std` contexts such as bootloaders
//! or kernels. The `std` feature adds loading from seekable [`std::io`] streams.
//!
//! ## Validates before exposing
//!
//! An [`Image`] only exists once its headers and section table have passed validation, and it
//! owns copies of every byte it needs, so later queries never touch the source again.
//!
//! ## Uses no unsafe code
//!
//! This crate contains zero unsafe blocks of code.
//!
//! # Example
//!
//! ```no_run
//! # fn inspect(bytes: &[u8]) -> Result<(), pe::PeError> {
//! let image = pe::parse(bytes)?;
//! for library in image.imported_libraries()? {
//!     log::info!("{} imports {} functions", library.name, library.functions.len());
//! }
//! # Ok(())
//! # }
//! ```

#![no_std]

extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

pub mod debug;
pub mod decode;
pub mod directory;
pub mod dotnet;
pub mod error;
pub mod exports;
pub mod factory;
pub mod header;
pub mod image;
pub mod imports;
pub mod load_config;
pub mod medium;
pub mod properties;
pub mod raw;
pub mod section;
pub mod tls;
pub mod util;
pub mod width;

#[cfg(test)]
mod test_util;

#[cfg(feature = "std")]
pub use factory::parse_stream;
pub use factory::{detect_width, parse, parse_with_options};

pub use debug::{DebugEntry, DebugType};
pub use directory::DirectoryId;
pub use dotnet::{ClrFlags, DotNetHeader};
pub use error::PeError;
pub use exports::{ExportDirectoryInfo, ExportedFunction};
pub use image::{Image, LoadOptions};
pub use imports::{ImportKind, ImportedFunction, ImportedLibrary};
pub use load_config::LoadConfigDirectory;
pub use medium::{Medium, MediumError, SectionView};
pub use properties::Properties;
pub use section::{Section, SectionDataKind};
pub use tls::TlsDirectory;
pub use width::{AnyWidth, Pe32, Pe64, Width};
