//! Rendering of the reports `pe-inspect` prints.

use std::io::Write;

use anyhow::{Context, Result};
use pe::{DirectoryId, Image, ImportKind, PeError, directory::NUMBER_OF_DIRECTORIES};

use crate::cli::{Action, Address};

/// Writes the report selected by `action` about `image` to `out`.
///
/// # Errors
///
/// Returns an error if `image` cannot answer the query or `out` cannot be written to.
pub fn write_report(out: &mut impl Write, image: &Image, action: Action) -> Result<()> {
    match action {
        Action::Info => info(out, image),
        Action::Sections => sections(out, image),
        Action::Convert(address) => convert(out, image, address),
        Action::Exports => exports(out, image),
        Action::Imports => imports(out, image),
        Action::DotNet => dot_net(out, image),
        Action::Directories => directories(out, image),
    }
}

/// Writes a summary of the headers.
fn info(out: &mut impl Write, image: &Image) -> Result<()> {
    let properties = image.properties();

    writeln!(out, "Width:               {:?}", image.width())?;
    writeln!(out, "Machine:             {:?}", properties.machine())?;
    writeln!(out, "Time stamp:          {:#010x}", properties.time_date_stamp())?;
    writeln!(out, "Characteristics:     {:?}", properties.characteristics())?;
    let (linker_major, linker_minor) = properties.linker_version();
    writeln!(out, "Linker version:      {linker_major}.{linker_minor}")?;
    writeln!(out, "Subsystem:           {:?}", properties.subsystem())?;
    writeln!(out, "DLL characteristics: {:?}", properties.dll_characteristics())?;
    writeln!(out, "Entry point:         {:#010x}", properties.entry_point())?;
    writeln!(out, "Image base:          {:#x}", properties.image_base())?;
    writeln!(out, "Section alignment:   {:#x}", properties.section_alignment())?;
    writeln!(out, "File alignment:      {:#x}", properties.file_alignment())?;
    writeln!(out, "Size of image:       {:#x}", properties.size_of_image())?;
    writeln!(out, "Size of headers:     {:#x}", properties.size_of_headers())?;
    writeln!(out, "Checksum:            {:#010x}", properties.checksum())?;
    writeln!(out, "Sections:            {}", image.sections().len())?;
    writeln!(
        out,
        "Kind:                {}{}",
        if image.is_dll() { "dll" } else { "executable" },
        if image.is_dot_net() { ", managed" } else { "" }
    )?;

    match image.overlay_offset() {
        Some(offset) => writeln!(out, "Overlay:             at {offset:#x}")?,
        None => writeln!(out, "Overlay:             none")?,
    }

    for entry in image.debug_entries() {
        write!(out, "Debug entry:         {:?}", entry.kind())?;
        if let Some(path) = entry.pdb_path() {
            write!(out, " {}", String::from_utf8_lossy(path))?;
        }
        writeln!(out)?;
    }

    Ok(())
}

/// Writes the section table.
fn sections(out: &mut impl Write, image: &Image) -> Result<()> {
    writeln!(
        out,
        "{:<8} {:>10} {:>10} {:>10} {:>10}  flags",
        "name", "address", "vsize", "offset", "rawsize"
    )?;
    for section in image.sections() {
        writeln!(
            out,
            "{:<8} {:#010x} {:#010x} {:#010x} {:#010x}  {}{}{}",
            String::from_utf8_lossy(section.name()),
            section.virtual_address(),
            section.virtual_size(),
            section.pointer_to_raw_data(),
            section.size_of_raw_data(),
            if section.is_readable() { 'r' } else { '-' },
            if section.is_writable() { 'w' } else { '-' },
            if section.is_executable() { 'x' } else { '-' },
        )?;
    }

    Ok(())
}

/// Writes every form of `address`.
fn convert(out: &mut impl Write, image: &Image, address: Address) -> Result<()> {
    let rva = match address {
        Address::Rva(rva) => rva,
        Address::Va(va) => image
            .va_to_rva(va, true)
            .with_context(|| format!("failed to translate VA {va:#x}"))?,
        Address::Offset(offset) => image
            .file_offset_to_rva(offset)
            .with_context(|| format!("failed to translate file offset {offset:#x}"))?,
    };

    writeln!(out, "RVA:         {rva:#010x}")?;
    match image.rva_to_va(rva) {
        Ok(va) => writeln!(out, "VA:          {va:#x}")?,
        Err(error) => writeln!(out, "VA:          {error}")?,
    }
    match image.rva_to_file_offset(rva) {
        Ok(offset) => writeln!(out, "File offset: {offset:#010x}")?,
        Err(error) => writeln!(out, "File offset: {error}")?,
    }
    match image.section_from_rva(rva) {
        Ok(section) => writeln!(
            out,
            "Section:     {}",
            String::from_utf8_lossy(section.name())
        )?,
        Err(PeError::RvaNotFound) => writeln!(out, "Section:     headers")?,
        Err(error) => writeln!(out, "Section:     {error}")?,
    }

    Ok(())
}

/// Writes the export directory and the exported functions.
fn exports(out: &mut impl Write, image: &Image) -> Result<()> {
    let Some(directory) = image
        .export_directory()
        .context("failed to read export directory")?
    else {
        writeln!(out, "no exports")?;
        return Ok(());
    };

    writeln!(
        out,
        "{} v{}.{}, ordinal base {}",
        directory.name, directory.major_version, directory.minor_version, directory.ordinal_base
    )?;
    let functions = image
        .exported_functions()
        .context("failed to read exported functions")?;
    for function in functions {
        write!(out, "{:>5} {:#010x}", function.ordinal, function.rva)?;
        if let Some(name) = &function.name {
            write!(out, " {name}")?;
        }
        if let Some(target) = &function.forwarded_name {
            write!(out, " -> {target}")?;
        }
        writeln!(out)?;
    }

    Ok(())
}

/// Writes the imported libraries and their functions.
fn imports(out: &mut impl Write, image: &Image) -> Result<()> {
    let libraries = image
        .imported_libraries()
        .context("failed to read import directory")?;
    if libraries.is_empty() {
        writeln!(out, "no imports")?;
    }

    for library in libraries {
        writeln!(out, "{} (IAT at {:#010x})", library.name, library.iat_rva)?;
        for function in &library.functions {
            match &function.kind {
                ImportKind::Ordinal(ordinal) => writeln!(out, "    #{ordinal}")?,
                ImportKind::Name { hint, name } => writeln!(out, "    {name} (hint {hint})")?,
            }
        }
    }

    Ok(())
}

/// Writes the CLR runtime header.
fn dot_net(out: &mut impl Write, image: &Image) -> Result<()> {
    let header = match image.dot_net_header() {
        Ok(header) => header,
        Err(PeError::ImageDoesNotHaveManagedCode) => {
            writeln!(out, "not a managed image")?;
            return Ok(());
        }
        Err(error) => return Err(error).context("failed to read CLR runtime header"),
    };

    let (major, minor) = header.runtime_version();
    writeln!(out, "Runtime version: {major}.{minor}")?;
    writeln!(
        out,
        "Metadata:        {:#010x} ({:#x} bytes)",
        header.metadata().virtual_address,
        header.metadata().size
    )?;
    writeln!(out, "Flags:           {:?}", header.flags())?;
    if header.is_native_entry_point() {
        writeln!(out, "Entry point:     {:#010x}", header.entry_point_token_or_rva())?;
    } else {
        writeln!(out, "Entry token:     {:#010x}", header.entry_point_token_or_rva())?;
    }

    Ok(())
}

/// Writes the data directories, the TLS callbacks and the load configuration directory.
fn directories(out: &mut impl Write, image: &Image) -> Result<()> {
    writeln!(
        out,
        "{} of {NUMBER_OF_DIRECTORIES} directories declared",
        image.properties().number_of_rva_and_sizes()
    )?;
    for id in DirectoryId::ALL {
        if let Ok(directory) = image.directory(id) {
            writeln!(
                out,
                "{:<14} {:#010x} {:#x}",
                format!("{id:?}"),
                directory.virtual_address,
                directory.size
            )?;
        }
    }

    if let Some(tls) = image.tls_directory().context("failed to read TLS directory")? {
        writeln!(out, "TLS index at {:#x}", tls.address_of_index)?;
        for callback in image.tls_callbacks().context("failed to read TLS callbacks")? {
            writeln!(out, "TLS callback {callback:#x}")?;
        }
    }

    if let Some(config) = image
        .load_config_directory()
        .context("failed to read load configuration directory")?
    {
        writeln!(out, "Security cookie at {:#x}", config.security_cookie)?;
        writeln!(out, "{} safe exception handlers", config.se_handler_count)?;
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::write_report;
    use crate::cli::{Action, Address};

    /// A PE32 image with no sections and an entry point inside the headers.
    fn headers_only() -> Vec<u8> {
        let mut bytes = vec![0u8; 0x200];
        bytes[0..2].copy_from_slice(b"MZ");
        bytes[0x3C..0x40].copy_from_slice(&0x40u32.to_le_bytes());
        bytes[0x40..0x44].copy_from_slice(b"PE\0\0");
        bytes[0x44..0x46].copy_from_slice(&0x014Cu16.to_le_bytes());
        bytes[0x54..0x56].copy_from_slice(&0xE0u16.to_le_bytes());
        bytes[0x56..0x58].copy_from_slice(&0x0102u16.to_le_bytes());

        let optional = 0x58;
        bytes[optional..optional + 2].copy_from_slice(&0x010Bu16.to_le_bytes());
        bytes[optional + 16..optional + 20].copy_from_slice(&0x100u32.to_le_bytes());
        bytes[optional + 28..optional + 32].copy_from_slice(&0x0040_0000u32.to_le_bytes());
        bytes[optional + 32..optional + 36].copy_from_slice(&0x1000u32.to_le_bytes());
        bytes[optional + 36..optional + 40].copy_from_slice(&0x200u32.to_le_bytes());
        bytes[optional + 56..optional + 60].copy_from_slice(&0x1000u32.to_le_bytes());
        bytes[optional + 60..optional + 64].copy_from_slice(&0x200u32.to_le_bytes());
        bytes[optional + 68..optional + 70].copy_from_slice(&3u16.to_le_bytes());
        bytes[optional + 92..optional + 96].copy_from_slice(&16u32.to_le_bytes());
        bytes
    }

    fn render(action: Action) -> String {
        let bytes = headers_only();
        let image = pe::parse(&bytes[..]).unwrap();

        let mut out = Vec::new();
        write_report(&mut out, &image, action).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn info_names_width_and_entry_point() {
        let report = render(Action::Info);

        assert!(report.contains("Width:               Pe32"));
        assert!(report.contains("Entry point:         0x00000100"));
        assert!(report.contains("Overlay:             none"));
    }

    #[test]
    fn header_addresses_convert() {
        let report = render(Action::Convert(Address::Va(0x0040_0100)));

        assert!(report.contains("RVA:         0x00000100"));
        assert!(report.contains("File offset: 0x00000100"));
        assert!(report.contains("Section:     headers"));
    }

    #[test]
    fn absent_directories_are_reported() {
        assert_eq!(render(Action::Imports), "no imports\n");
        assert_eq!(render(Action::DotNet), "not a managed image\n");
        assert_eq!(render(Action::Exports), "no exports\n");
    }
}
