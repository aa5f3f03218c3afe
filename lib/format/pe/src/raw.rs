//! Raw definitions of PE structures.
//!
//! Layouts mirror the on-disk format. Sizes are asserted at compile time so that no implicit
//! padding can slip into a decoded structure.

#![expect(missing_docs, reason = "no need to document raw definitions")]

use core::mem;

use crate::decode::decode_struct;

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
pub struct DosHeader {
    pub magic: u16,
    pub cblp: u16,
    pub cp: u16,
    pub crlc: u16,
    pub cparhdr: u16,
    pub minalloc: u16,
    pub maxalloc: u16,
    pub ss: u16,
    pub sp: u16,
    pub csum: u16,
    pub ip: u16,
    pub cs: u16,
    pub lfarlc: u16,
    pub ovno: u16,
    pub res: [u16; 4],
    pub oemid: u16,
    pub oeminfo: u16,
    pub res_2: [u16; 10],
    pub lfanew: u32,
}

decode_struct!(DosHeader {
    magic, cblp, cp, crlc, cparhdr, minalloc, maxalloc, ss, sp, csum, ip, cs, lfarlc, ovno, res,
    oemid, oeminfo, res_2, lfanew,
});

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
pub struct FileHeader {
    pub machine: u16,
    pub number_of_sections: u16,
    pub time_date_stamp: u32,
    pub symbol_table_ptr: u32,
    pub symbol_count: u32,
    pub optional_header_size: u16,
    pub characteristics: u16,
}

decode_struct!(FileHeader {
    machine,
    number_of_sections,
    time_date_stamp,
    symbol_table_ptr,
    symbol_count,
    optional_header_size,
    characteristics,
});

/// The fixed part of the 32-bit optional header, which is followed on disk by
/// `number_of_rva_and_sizes` [`DataDirectory`] entries.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
pub struct OptionalHeader32 {
    pub magic: u16,
    pub linker_major_version: u8,
    pub linker_minor_version: u8,
    pub code_size: u32,
    pub initialized_data_size: u32,
    pub uninitialized_data_size: u32,
    pub entry_point: u32,
    pub base_of_code: u32,
    pub base_of_data: u32,

    pub image_base: u32,
    pub section_alignment: u32,
    pub file_alignment: u32,
    pub operating_system_major_version: u16,
    pub operating_system_minor_version: u16,
    pub image_major_version: u16,
    pub image_minor_version: u16,
    pub subsystem_major_version: u16,
    pub subsystem_minor_version: u16,
    pub win32_version_value: u32,
    pub image_size: u32,
    pub header_size: u32,
    pub checksum: u32,
    pub subsystem: u16,
    pub dll_characteristics: u16,
    pub size_of_stack_reserve: u32,
    pub size_of_stack_commit: u32,
    pub size_of_heap_reserve: u32,
    pub size_of_heap_commit: u32,
    pub loader_flags: u32,
    pub number_of_rva_and_sizes: u32,
}

decode_struct!(OptionalHeader32 {
    magic,
    linker_major_version,
    linker_minor_version,
    code_size,
    initialized_data_size,
    uninitialized_data_size,
    entry_point,
    base_of_code,
    base_of_data,
    image_base,
    section_alignment,
    file_alignment,
    operating_system_major_version,
    operating_system_minor_version,
    image_major_version,
    image_minor_version,
    subsystem_major_version,
    subsystem_minor_version,
    win32_version_value,
    image_size,
    header_size,
    checksum,
    subsystem,
    dll_characteristics,
    size_of_stack_reserve,
    size_of_stack_commit,
    size_of_heap_reserve,
    size_of_heap_commit,
    loader_flags,
    number_of_rva_and_sizes,
});

/// The fixed part of the 64-bit optional header, which is followed on disk by
/// `number_of_rva_and_sizes` [`DataDirectory`] entries.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
pub struct OptionalHeader64 {
    pub magic: u16,
    pub linker_major_version: u8,
    pub linker_minor_version: u8,
    pub code_size: u32,
    pub initialized_data_size: u32,
    pub uninitialized_data_size: u32,
    pub entry_point: u32,
    pub base_of_code: u32,

    pub image_base: u64,
    pub section_alignment: u32,
    pub file_alignment: u32,
    pub operating_system_major_version: u16,
    pub operating_system_minor_version: u16,
    pub image_major_version: u16,
    pub image_minor_version: u16,
    pub subsystem_major_version: u16,
    pub subsystem_minor_version: u16,
    pub win32_version_value: u32,
    pub image_size: u32,
    pub header_size: u32,
    pub checksum: u32,
    pub subsystem: u16,
    pub dll_characteristics: u16,
    pub size_of_stack_reserve: u64,
    pub size_of_stack_commit: u64,
    pub size_of_heap_reserve: u64,
    pub size_of_heap_commit: u64,
    pub loader_flags: u32,
    pub number_of_rva_and_sizes: u32,
}

decode_struct!(OptionalHeader64 {
    magic,
    linker_major_version,
    linker_minor_version,
    code_size,
    initialized_data_size,
    uninitialized_data_size,
    entry_point,
    base_of_code,
    image_base,
    section_alignment,
    file_alignment,
    operating_system_major_version,
    operating_system_minor_version,
    image_major_version,
    image_minor_version,
    subsystem_major_version,
    subsystem_minor_version,
    win32_version_value,
    image_size,
    header_size,
    checksum,
    subsystem,
    dll_characteristics,
    size_of_stack_reserve,
    size_of_stack_commit,
    size_of_heap_reserve,
    size_of_heap_commit,
    loader_flags,
    number_of_rva_and_sizes,
});

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
pub struct DataDirectory {
    pub virtual_address: u32,
    pub size: u32,
}

decode_struct!(DataDirectory {
    virtual_address,
    size
});

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
pub struct SectionHeader {
    pub name: [u8; 8],
    pub virtual_size: u32,
    pub virtual_address: u32,
    pub size_of_raw_data: u32,
    pub pointer_to_raw_data: u32,
    pub pointer_to_relocations: u32,
    pub pointer_to_line_numbers: u32,
    pub number_of_relocations: u16,
    pub number_of_line_numbers: u16,
    pub characteristics: u32,
}

decode_struct!(SectionHeader {
    name,
    virtual_size,
    virtual_address,
    size_of_raw_data,
    pointer_to_raw_data,
    pointer_to_relocations,
    pointer_to_line_numbers,
    number_of_relocations,
    number_of_line_numbers,
    characteristics,
});

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
pub struct ExportDirectory {
    pub characteristics: u32,
    pub time_date_stamp: u32,
    pub major_version: u16,
    pub minor_version: u16,
    pub name: u32,
    pub base: u32,
    pub number_of_functions: u32,
    pub number_of_names: u32,
    pub address_of_functions: u32,
    pub address_of_names: u32,
    pub address_of_name_ordinals: u32,
}

decode_struct!(ExportDirectory {
    characteristics,
    time_date_stamp,
    major_version,
    minor_version,
    name,
    base,
    number_of_functions,
    number_of_names,
    address_of_functions,
    address_of_names,
    address_of_name_ordinals,
});

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
pub struct ImportDescriptor {
    pub original_first_thunk: u32,
    pub time_date_stamp: u32,
    pub forwarder_chain: u32,
    pub name: u32,
    pub first_thunk: u32,
}

decode_struct!(ImportDescriptor {
    original_first_thunk,
    time_date_stamp,
    forwarder_chain,
    name,
    first_thunk,
});

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
pub struct DebugDirectory {
    pub characteristics: u32,
    pub time_date_stamp: u32,
    pub major_version: u16,
    pub minor_version: u16,
    pub kind: u32,
    pub size_of_data: u32,
    pub address_of_raw_data: u32,
    pub pointer_to_raw_data: u32,
}

decode_struct!(DebugDirectory {
    characteristics,
    time_date_stamp,
    major_version,
    minor_version,
    kind,
    size_of_data,
    address_of_raw_data,
    pointer_to_raw_data,
});

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
pub struct TlsDirectory32 {
    pub start_address_of_raw_data: u32,
    pub end_address_of_raw_data: u32,
    pub address_of_index: u32,
    pub address_of_callbacks: u32,
    pub size_of_zero_fill: u32,
    pub characteristics: u32,
}

decode_struct!(TlsDirectory32 {
    start_address_of_raw_data,
    end_address_of_raw_data,
    address_of_index,
    address_of_callbacks,
    size_of_zero_fill,
    characteristics,
});

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
pub struct TlsDirectory64 {
    pub start_address_of_raw_data: u64,
    pub end_address_of_raw_data: u64,
    pub address_of_index: u64,
    pub address_of_callbacks: u64,
    pub size_of_zero_fill: u32,
    pub characteristics: u32,
}

decode_struct!(TlsDirectory64 {
    start_address_of_raw_data,
    end_address_of_raw_data,
    address_of_index,
    address_of_callbacks,
    size_of_zero_fill,
    characteristics,
});

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
pub struct LoadConfigDirectory32 {
    pub size: u32,
    pub time_date_stamp: u32,
    pub major_version: u16,
    pub minor_version: u16,
    pub global_flags_clear: u32,
    pub global_flags_set: u32,
    pub critical_section_default_timeout: u32,
    pub de_commit_free_block_threshold: u32,
    pub de_commit_total_free_threshold: u32,
    pub lock_prefix_table: u32,
    pub maximum_allocation_size: u32,
    pub virtual_memory_threshold: u32,
    pub process_heap_flags: u32,
    pub process_affinity_mask: u32,
    pub csd_version: u16,
    pub reserved: u16,
    pub edit_list: u32,
    pub security_cookie: u32,
    pub se_handler_table: u32,
    pub se_handler_count: u32,
}

decode_struct!(LoadConfigDirectory32 {
    size,
    time_date_stamp,
    major_version,
    minor_version,
    global_flags_clear,
    global_flags_set,
    critical_section_default_timeout,
    de_commit_free_block_threshold,
    de_commit_total_free_threshold,
    lock_prefix_table,
    maximum_allocation_size,
    virtual_memory_threshold,
    process_heap_flags,
    process_affinity_mask,
    csd_version,
    reserved,
    edit_list,
    security_cookie,
    se_handler_table,
    se_handler_count,
});

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
pub struct LoadConfigDirectory64 {
    pub size: u32,
    pub time_date_stamp: u32,
    pub major_version: u16,
    pub minor_version: u16,
    pub global_flags_clear: u32,
    pub global_flags_set: u32,
    pub critical_section_default_timeout: u32,
    pub de_commit_free_block_threshold: u64,
    pub de_commit_total_free_threshold: u64,
    pub lock_prefix_table: u64,
    pub maximum_allocation_size: u64,
    pub virtual_memory_threshold: u64,
    pub process_affinity_mask: u64,
    pub process_heap_flags: u32,
    pub csd_version: u16,
    pub reserved: u16,
    pub edit_list: u64,
    pub security_cookie: u64,
    pub se_handler_table: u64,
    pub se_handler_count: u64,
}

decode_struct!(LoadConfigDirectory64 {
    size,
    time_date_stamp,
    major_version,
    minor_version,
    global_flags_clear,
    global_flags_set,
    critical_section_default_timeout,
    de_commit_free_block_threshold,
    de_commit_total_free_threshold,
    lock_prefix_table,
    maximum_allocation_size,
    virtual_memory_threshold,
    process_affinity_mask,
    process_heap_flags,
    csd_version,
    reserved,
    edit_list,
    security_cookie,
    se_handler_table,
    se_handler_count,
});

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
pub struct Clr20Header {
    pub cb: u32,
    pub major_runtime_version: u16,
    pub minor_runtime_version: u16,
    pub metadata: DataDirectory,
    pub flags: u32,
    pub entry_point_token: u32,
    pub resources: DataDirectory,
    pub strong_name_signature: DataDirectory,
    pub code_manager_table: DataDirectory,
    pub vtable_fixups: DataDirectory,
    pub export_address_table_jumps: DataDirectory,
    pub managed_native_header: DataDirectory,
}

decode_struct!(Clr20Header {
    cb,
    major_runtime_version,
    minor_runtime_version,
    metadata,
    flags,
    entry_point_token,
    resources,
    strong_name_signature,
    code_manager_table,
    vtable_fixups,
    export_address_table_jumps,
    managed_native_header,
});

const _: () = assert!(mem::size_of::<DosHeader>() == 64);
const _: () = assert!(mem::offset_of!(DosHeader, lfanew) == 0x3C);
const _: () = assert!(mem::size_of::<FileHeader>() == 20);
const _: () = assert!(mem::size_of::<OptionalHeader32>() == 96);
const _: () = assert!(mem::size_of::<OptionalHeader64>() == 112);
const _: () = assert!(mem::size_of::<DataDirectory>() == 8);
const _: () = assert!(mem::size_of::<SectionHeader>() == 40);
const _: () = assert!(mem::size_of::<ExportDirectory>() == 40);
const _: () = assert!(mem::size_of::<ImportDescriptor>() == 20);
const _: () = assert!(mem::size_of::<DebugDirectory>() == 28);
const _: () = assert!(mem::size_of::<TlsDirectory32>() == 24);
const _: () = assert!(mem::size_of::<TlsDirectory64>() == 40);
const _: () = assert!(mem::size_of::<LoadConfigDirectory32>() == 72);
const _: () = assert!(mem::size_of::<LoadConfigDirectory64>() == 112);
const _: () = assert!(mem::size_of::<Clr20Header>() == 72);
