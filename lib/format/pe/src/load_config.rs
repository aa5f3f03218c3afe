//! Reading of the load configuration directory.

use crate::{
    directory::DirectoryId,
    error::PeError,
    image::Image,
    raw::{LoadConfigDirectory32, LoadConfigDirectory64},
    section::SectionDataKind,
    width::{Width, width_32::PE32_MAGIC},
};

/// The load configuration directory with width sized fields widened to 64 bits.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
pub struct LoadConfigDirectory {
    /// The size of the structure as recorded by the linker.
    pub size: u32,
    /// The time stamp.
    pub time_date_stamp: u32,
    /// The major version number.
    pub major_version: u16,
    /// The minor version number.
    pub minor_version: u16,
    /// Global flags to clear when the process starts.
    pub global_flags_clear: u32,
    /// Global flags to set when the process starts.
    pub global_flags_set: u32,
    /// The default critical section timeout.
    pub critical_section_default_timeout: u32,
    /// The free block threshold of the process heap.
    pub de_commit_free_block_threshold: u64,
    /// The total free threshold of the process heap.
    pub de_commit_total_free_threshold: u64,
    /// The virtual address of the lock prefix table.
    pub lock_prefix_table: u64,
    /// The maximum allocation size.
    pub maximum_allocation_size: u64,
    /// The maximum virtual memory size.
    pub virtual_memory_threshold: u64,
    /// The process affinity mask.
    pub process_affinity_mask: u64,
    /// The process heap flags.
    pub process_heap_flags: u32,
    /// The service pack version.
    pub csd_version: u16,
    /// The virtual address of the edit list.
    pub edit_list: u64,
    /// The virtual address of the security cookie.
    pub security_cookie: u64,
    /// The virtual address of the safe exception handler table.
    pub se_handler_table: u64,
    /// The number of safe exception handlers.
    pub se_handler_count: u64,
}

impl From<LoadConfigDirectory32> for LoadConfigDirectory {
    fn from(value: LoadConfigDirectory32) -> Self {
        Self {
            size: value.size,
            time_date_stamp: value.time_date_stamp,
            major_version: value.major_version,
            minor_version: value.minor_version,
            global_flags_clear: value.global_flags_clear,
            global_flags_set: value.global_flags_set,
            critical_section_default_timeout: value.critical_section_default_timeout,
            de_commit_free_block_threshold: u64::from(value.de_commit_free_block_threshold),
            de_commit_total_free_threshold: u64::from(value.de_commit_total_free_threshold),
            lock_prefix_table: u64::from(value.lock_prefix_table),
            maximum_allocation_size: u64::from(value.maximum_allocation_size),
            virtual_memory_threshold: u64::from(value.virtual_memory_threshold),
            process_affinity_mask: u64::from(value.process_affinity_mask),
            process_heap_flags: value.process_heap_flags,
            csd_version: value.csd_version,
            edit_list: u64::from(value.edit_list),
            security_cookie: u64::from(value.security_cookie),
            se_handler_table: u64::from(value.se_handler_table),
            se_handler_count: u64::from(value.se_handler_count),
        }
    }
}

impl From<LoadConfigDirectory64> for LoadConfigDirectory {
    fn from(value: LoadConfigDirectory64) -> Self {
        Self {
            size: value.size,
            time_date_stamp: value.time_date_stamp,
            major_version: value.major_version,
            minor_version: value.minor_version,
            global_flags_clear: value.global_flags_clear,
            global_flags_set: value.global_flags_set,
            critical_section_default_timeout: value.critical_section_default_timeout,
            de_commit_free_block_threshold: value.de_commit_free_block_threshold,
            de_commit_total_free_threshold: value.de_commit_total_free_threshold,
            lock_prefix_table: value.lock_prefix_table,
            maximum_allocation_size: value.maximum_allocation_size,
            virtual_memory_threshold: value.virtual_memory_threshold,
            process_affinity_mask: value.process_affinity_mask,
            process_heap_flags: value.process_heap_flags,
            csd_version: value.csd_version,
            edit_list: value.edit_list,
            security_cookie: value.security_cookie,
            se_handler_table: value.se_handler_table,
            se_handler_count: value.se_handler_count,
        }
    }
}

impl<W: Width> Image<W> {
    /// Reads the load configuration directory, or [`None`] if the image has none.
    ///
    /// # Errors
    ///
    /// Returns [`PeError::RvaNotFound`] or [`PeError::RvaDoesNotExist`] if the structure does
    /// not fit inside the image.
    pub fn load_config_directory(&self) -> Result<Option<LoadConfigDirectory>, PeError> {
        if !self.has_load_config() {
            return Ok(None);
        }

        let rva = self.directory_rva(DirectoryId::LOAD_CONFIG)?;
        let kind = SectionDataKind::Virtual;
        let directory = if self.width().magic() == PE32_MAGIC {
            LoadConfigDirectory::from(self.read_at::<LoadConfigDirectory32>(rva, kind, true)?)
        } else {
            LoadConfigDirectory::from(self.read_at::<LoadConfigDirectory64>(rva, kind, true)?)
        };

        Ok(Some(directory))
    }
}
