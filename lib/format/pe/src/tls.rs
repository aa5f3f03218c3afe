//! Reading of the thread local storage directory.

use alloc::vec::Vec;

use crate::{
    directory::DirectoryId,
    error::PeError,
    image::Image,
    raw::{TlsDirectory32, TlsDirectory64},
    section::SectionDataKind,
    width::{Width, width_32::PE32_MAGIC},
};

/// The thread local storage directory with addresses widened to 64 bits.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
pub struct TlsDirectory {
    /// The virtual address of the start of the TLS template.
    pub start_address_of_raw_data: u64,
    /// The virtual address of the end of the TLS template.
    pub end_address_of_raw_data: u64,
    /// The virtual address that receives the TLS index.
    pub address_of_index: u64,
    /// The virtual address of the null-terminated array of TLS callbacks.
    pub address_of_callbacks: u64,
    /// The number of zero bytes that follow the template.
    pub size_of_zero_fill: u32,
    /// Alignment information.
    pub characteristics: u32,
}

impl From<TlsDirectory32> for TlsDirectory {
    fn from(value: TlsDirectory32) -> Self {
        Self {
            start_address_of_raw_data: u64::from(value.start_address_of_raw_data),
            end_address_of_raw_data: u64::from(value.end_address_of_raw_data),
            address_of_index: u64::from(value.address_of_index),
            address_of_callbacks: u64::from(value.address_of_callbacks),
            size_of_zero_fill: value.size_of_zero_fill,
            characteristics: value.characteristics,
        }
    }
}

impl From<TlsDirectory64> for TlsDirectory {
    fn from(value: TlsDirectory64) -> Self {
        Self {
            start_address_of_raw_data: value.start_address_of_raw_data,
            end_address_of_raw_data: value.end_address_of_raw_data,
            address_of_index: value.address_of_index,
            address_of_callbacks: value.address_of_callbacks,
            size_of_zero_fill: value.size_of_zero_fill,
            characteristics: value.characteristics,
        }
    }
}

#[expect(clippy::missing_errors_doc)]
impl<W: Width> Image<W> {
    /// Reads the thread local storage directory, or [`None`] if the image has none.
    pub fn tls_directory(&self) -> Result<Option<TlsDirectory>, PeError> {
        if !self.has_tls() {
            return Ok(None);
        }

        let rva = self.directory_rva(DirectoryId::TLS)?;
        let directory = if self.width().magic() == PE32_MAGIC {
            TlsDirectory::from(self.read_at::<TlsDirectory32>(rva, SectionDataKind::Virtual, true)?)
        } else {
            TlsDirectory::from(self.read_at::<TlsDirectory64>(rva, SectionDataKind::Virtual, true)?)
        };

        Ok(Some(directory))
    }

    /// Returns the virtual addresses of the TLS callbacks, in table order.
    ///
    /// Returns an empty list if the image has no TLS directory or no callbacks.
    pub fn tls_callbacks(&self) -> Result<Vec<u64>, PeError> {
        let mut callbacks = Vec::new();
        let Some(directory) = self.tls_directory()? else {
            return Ok(callbacks);
        };
        if directory.address_of_callbacks == 0 {
            return Ok(callbacks);
        }

        let thunk_size = self.width().thunk_size();
        let mut rva = self.va_to_rva(directory.address_of_callbacks, true)?;
        loop {
            let callback: u64 = self
                .read_address_at(rva, SectionDataKind::Virtual, true)?
                .into();
            if callback == 0 {
                break;
            }

            callbacks.push(callback);
            rva = rva
                .checked_add(thunk_size)
                .ok_or(PeError::RvaDoesNotExist)?;
        }

        Ok(callbacks)
    }
}

#[cfg(test)]
mod test {
    use crate::{
        directory::DirectoryId,
        image::Image,
        test_util::{ImageBuilder, TestSection, put_u32, put_u64},
        width::{Pe32, Pe64},
    };

    #[test]
    fn reads_narrow_directory_and_callbacks() {
        let mut data = [0u8; 0x200];
        put_u32(&mut data, 0x00, 0x0040_1100);
        put_u32(&mut data, 0x04, 0x0040_1110);
        put_u32(&mut data, 0x08, 0x0040_1120);
        put_u32(&mut data, 0x0C, 0x0040_1040);
        put_u32(&mut data, 0x10, 0x20);
        put_u32(&mut data, 0x40, 0x0040_2000);
        put_u32(&mut data, 0x44, 0x0040_2010);

        let bytes = ImageBuilder::pe32()
            .image_base(0x0040_0000)
            .section(TestSection::new(*b".tls\0\0\0\0", 0x1000, 0x200).data(&data))
            .directory(DirectoryId::TLS, 0x1000, 24)
            .build();
        let image = Image::parse(&bytes[..], Pe32).unwrap();

        let directory = image.tls_directory().unwrap().unwrap();
        assert_eq!(directory.start_address_of_raw_data, 0x0040_1100);
        assert_eq!(directory.size_of_zero_fill, 0x20);
        assert_eq!(
            image.tls_callbacks().unwrap(),
            [0x0040_2000, 0x0040_2010]
        );
    }

    #[test]
    fn reads_wide_directory() {
        let mut data = [0u8; 0x200];
        put_u64(&mut data, 0x00, 0x1_4000_1100);
        put_u64(&mut data, 0x18, 0);
        put_u32(&mut data, 0x24, 0x0030_0000);

        let bytes = ImageBuilder::pe64()
            .image_base(0x1_4000_0000)
            .section(TestSection::new(*b".tls\0\0\0\0", 0x1000, 0x200).data(&data))
            .directory(DirectoryId::TLS, 0x1000, 40)
            .build();
        let image = Image::parse(&bytes[..], Pe64).unwrap();

        let directory = image.tls_directory().unwrap().unwrap();
        assert_eq!(directory.start_address_of_raw_data, 0x1_4000_1100);
        assert_eq!(directory.characteristics, 0x0030_0000);
        assert!(image.tls_callbacks().unwrap().is_empty());
    }

    #[test]
    fn absent_directory() {
        let bytes = ImageBuilder::pe32()
            .section(TestSection::new(*b".text\0\0\0", 0x1000, 0x200))
            .build();
        let image = Image::parse(&bytes[..], Pe32).unwrap();

        assert_eq!(image.tls_directory(), Ok(None));
        assert!(image.tls_callbacks().unwrap().is_empty());
    }
}
