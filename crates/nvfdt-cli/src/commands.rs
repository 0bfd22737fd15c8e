use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use nvfdt_device::{ByteDevice, MmapDevice};
use nvfdt_format::{FdtHeader, TreeStats};
use nvfdt_layer::{
    load_blob, Binding, Cell, CellDevice, DeviceRegistry, FdtCellDevice, FdtLayerDriver,
    LayerConfig, Validation,
};
use serde::Serialize;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => LayerConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => LayerConfig::default(),
    };
    match cli.command {
        Command::Cells(args) => cmd_cells(&args, &config, cli.format),
        Command::Read(args) => cmd_read(&args, &config, cli.format),
        Command::Check(args) => cmd_check(&args, &config, cli.format),
    }
}

fn open_layer(image: &Path, config: &LayerConfig) -> anyhow::Result<Arc<FdtCellDevice>> {
    let lower = MmapDevice::open(image).with_context(|| format!("opening {}", image.display()))?;
    let device = FdtLayerDriver::new(config.clone())
        .probe(&Binding::new(Arc::new(lower)), &DeviceRegistry::new())
        .with_context(|| format!("binding {}", image.display()))?;
    Ok(device)
}

#[derive(Debug, Serialize)]
struct CellsReport {
    device: String,
    cells: Vec<Cell>,
}

fn cells_report(image: &Path, config: &LayerConfig) -> anyhow::Result<CellsReport> {
    let device = open_layer(image, config)?;
    Ok(CellsReport {
        device: device.name().to_owned(),
        cells: device.cells().iter().cloned().collect(),
    })
}

fn cmd_cells(args: &CellsArgs, config: &LayerConfig, format: OutputFormat) -> anyhow::Result<()> {
    let report = cells_report(&args.image, config)?;
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    println!("{} ({} cells)", report.device.bold(), report.cells.len());
    for cell in &report.cells {
        println!("  {}  {:>6}  {}", cell.token.to_string().yellow(), cell.length, cell.name);
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct ReadReport {
    device: String,
    cell: String,
    length: usize,
    hex: String,
}

fn read_report(args: &ReadArgs, config: &LayerConfig) -> anyhow::Result<ReadReport> {
    let device = open_layer(&args.image, config)?;
    let cell = device
        .cells()
        .by_name(&args.cell)
        .with_context(|| format!("no cell named {:?} on {}", args.cell, device.name()))?;
    let mut buf = vec![0u8; args.length.unwrap_or(cell.length)];
    device
        .read(cell.token, &mut buf)
        .with_context(|| format!("reading {} bytes of {}", buf.len(), cell.name))?;
    Ok(ReadReport {
        device: device.name().to_owned(),
        cell: cell.name.clone(),
        length: buf.len(),
        hex: hex::encode(&buf),
    })
}

fn cmd_read(args: &ReadArgs, config: &LayerConfig, format: OutputFormat) -> anyhow::Result<()> {
    let report = read_report(args, config)?;
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    println!("{} {} ({} bytes)", report.device.bold(), report.cell.cyan(), report.length);
    for (i, line) in report.hex.as_bytes().chunks(32).enumerate() {
        let line = std::str::from_utf8(line).unwrap_or_default();
        println!("  {:08x}  {line}", i * 16);
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct CheckReport {
    device: String,
    header: FdtHeader,
    stats: TreeStats,
}

fn check_report(image: &Path, config: &LayerConfig) -> anyhow::Result<CheckReport> {
    let lower = MmapDevice::open(image).with_context(|| format!("opening {}", image.display()))?;
    // Always walk the whole tree here, whatever the layer config says.
    let config = LayerConfig {
        validation: Validation::Full,
        ..config.clone()
    };
    let blob = load_blob(&lower, &config).with_context(|| format!("loading {}", image.display()))?;
    let stats = blob.fdt()?.check_full()?;
    Ok(CheckReport {
        device: config.display_name(lower.name()),
        header: *blob.header(),
        stats,
    })
}

fn cmd_check(args: &CheckArgs, config: &LayerConfig, format: OutputFormat) -> anyhow::Result<()> {
    let report = check_report(&args.image, config)?;
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    let h = &report.header;
    println!("{} {}", "✓".green().bold(), report.device.bold());
    println!("  Version: {} (compatible with {})", h.version, h.last_comp_version);
    println!("  Total size: {} bytes", h.totalsize);
    println!("  Struct: {:#x} (+{:#x})", h.off_dt_struct, h.struct_size());
    println!("  Strings: {:#x} (+{:#x})", h.off_dt_strings, h.size_dt_strings);
    println!(
        "  Nodes: {}, properties: {}, depth: {}, reservations: {}",
        report.stats.nodes, report.stats.properties, report.stats.max_depth, report.stats.reservations
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nvfdt_format::{FdtBuilder, NodeBuilder};
    use std::path::PathBuf;

    fn write_image(dir: &Path) -> PathBuf {
        let path = dir.join("board-eeprom.bin");
        FdtBuilder::new()
            .property("serial-number", b"SN000042")
            .property("mac-address", &[0x02, 0, 0x5e, 0x10, 0x20, 0x30])
            .child(NodeBuilder::new("extra").property_u32("reg", 1))
            .write_to(&path)
            .unwrap();
        path
    }

    #[test]
    fn cells_lists_root_properties() {
        let dir = tempfile::tempdir().unwrap();
        let image = write_image(dir.path());
        let report = cells_report(&image, &LayerConfig::default()).unwrap();
        assert_eq!(report.device, "board-eeprom-fdt");
        let names: Vec<_> = report.cells.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["serial-number", "mac-address"]);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["cells"][1]["length"], 6);
    }

    #[test]
    fn read_full_and_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let image = write_image(dir.path());
        let mut args = ReadArgs {
            image,
            cell: "mac-address".into(),
            length: None,
        };
        let report = read_report(&args, &LayerConfig::default()).unwrap();
        assert_eq!(report.hex, "02005e102030");

        args.length = Some(2);
        assert_eq!(read_report(&args, &LayerConfig::default()).unwrap().hex, "0200");

        args.length = Some(7);
        let err = read_report(&args, &LayerConfig::default()).unwrap_err();
        assert!(format!("{err:#}").contains("operation not supported"));
    }

    #[test]
    fn read_unknown_cell() {
        let dir = tempfile::tempdir().unwrap();
        let args = ReadArgs {
            image: write_image(dir.path()),
            cell: "reg".into(),
            length: None,
        };
        assert!(read_report(&args, &LayerConfig::default()).is_err());
    }

    #[test]
    fn check_reports_structure() {
        let dir = tempfile::tempdir().unwrap();
        let image = write_image(dir.path());
        let report = check_report(&image, &LayerConfig::header_only()).unwrap();
        assert_eq!(report.header.version, 17);
        assert_eq!(report.stats.nodes, 2);
        assert_eq!(report.stats.properties, 3);
    }

    #[test]
    fn check_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.bin");
        std::fs::write(&path, vec![0xa5u8; 128]).unwrap();
        let err = check_report(&path, &LayerConfig::default()).unwrap_err();
        assert!(format!("{err:#}").contains("invalid FDT magic"));
    }
}
