use anyhow::{bail, Context, Result};
use colored::Colorize;
use dliscan_core::constants::{LR_TYPE_CHANNEL, LR_TYPE_FDATA, LR_TYPE_FRAME};
use dliscan_core::eflr::ExplicitlyFormattedLogicalRecord;
use dliscan_core::framing::RecordReader;
use dliscan_core::iflr::IndirectlyFormattedLogicalRecord;
use dliscan_core::logpass::LogPass;
use dliscan_core::repcode::ObjectName;
use std::fs::{self, File};
use std::io::BufReader;
use tracing::info;

pub fn execute(input: &str, channels: &[String], output: Option<&str>) -> Result<()> {
    info!("Reading curves from: {}", input);

    let file = File::open(input).with_context(|| format!("Failed to open input file: {}", input))?;
    let reader = RecordReader::new(BufReader::new(file))
        .with_context(|| format!("Not an RP66V1 file: {}", input))?;

    // Schema records of the first log pass plus all frame data addressed at
    // it. CHANNEL and FRAME always precede their FDATA in a well-formed file.
    let mut channel_eflr = None;
    let mut frame_eflr = None;
    let mut fdata = Vec::new();
    for record in reader {
        let mut record = record.with_context(|| format!("Broken record stream in {}", input))?;
        match (record.is_eflr, record.lr_type) {
            (true, LR_TYPE_CHANNEL) if channel_eflr.is_none() => {
                channel_eflr = Some(
                    ExplicitlyFormattedLogicalRecord::parse(record.lr_type, &mut record.data)
                        .with_context(|| "Undecodable CHANNEL record")?,
                );
            }
            (true, LR_TYPE_FRAME) if frame_eflr.is_none() => {
                frame_eflr = Some(
                    ExplicitlyFormattedLogicalRecord::parse(record.lr_type, &mut record.data)
                        .with_context(|| "Undecodable FRAME record")?,
                );
            }
            (false, LR_TYPE_FDATA) if !record.is_encrypted => fdata.push(record.data),
            _ => {}
        }
    }
    let (Some(frame_eflr), Some(channel_eflr)) = (frame_eflr, channel_eflr) else {
        bail!("{} has no FRAME/CHANNEL records, nothing to materialize", input);
    };

    let mut log_pass =
        LogPass::from_eflrs(&frame_eflr, &channel_eflr).with_context(|| "Inconsistent log pass")?;
    info!(
        "{} frame array(s), {} FDATA record(s)",
        log_pass.len(),
        fdata.len()
    );

    for array in log_pass.frame_arrays_mut() {
        array.init_arrays(fdata.len());
    }
    for mut ld in fdata {
        let iflr = IndirectlyFormattedLogicalRecord::parse(&mut ld)?;
        let Some(array) = log_pass.frame_array_mut(&iflr.object_name) else {
            bail!("FDATA addresses unknown frame {}", iflr.object_name);
        };
        if channels.is_empty() {
            array.read_frame(&mut ld)?;
        } else {
            let wanted = resolve_channels(array.channels(), channels)?;
            array.read_frame_partial(&mut ld, &wanted)?;
        }
    }

    if let Some(output_path) = output {
        let json = serde_json::to_string_pretty(&log_pass_to_json(&log_pass))
            .with_context(|| "Failed to serialize curves")?;
        fs::write(output_path, json)
            .with_context(|| format!("Failed to write output file: {}", output_path))?;
        info!("Curves written to: {}", output_path);
        return Ok(());
    }

    for array in log_pass.frame_arrays() {
        println!(
            "{} {} ({} frames)",
            "Frame".bold(),
            array.name.to_string().green().bold(),
            array.frames_read()
        );
        for channel in array.channels() {
            let ident = String::from_utf8_lossy(&channel.name.identifier).to_string();
            let units = String::from_utf8_lossy(&channel.units).to_string();
            let range = match curve_range(channel) {
                Some((min, max)) => format!("min {min} max {max}"),
                None => "not decoded".to_string(),
            };
            println!("  {:8} {:8} {:6} values  {}", ident, units, channel.array.len(), range);
        }
    }
    Ok(())
}

/// Map requested channel identifiers to Object names within one frame array
fn resolve_channels(
    available: &[dliscan_core::logpass::FrameChannel],
    requested: &[String],
) -> Result<Vec<ObjectName>> {
    let mut wanted = Vec::with_capacity(requested.len());
    for ident in requested {
        let channel = available
            .iter()
            .find(|c| c.name.identifier == ident.as_bytes())
            .with_context(|| format!("No channel named {ident} in this frame"))?;
        wanted.push(channel.name.clone());
    }
    Ok(wanted)
}

fn curve_range(channel: &dliscan_core::logpass::FrameChannel) -> Option<(f64, f64)> {
    let mut values = (0..channel.array.len()).filter_map(|i| channel.array.value_f64(i));
    let first = values.next()?;
    let (min, max) = values.fold((first, first), |(min, max), v| (min.min(v), max.max(v)));
    Some((min, max))
}

fn log_pass_to_json(log_pass: &LogPass) -> serde_json::Value {
    let arrays: Vec<serde_json::Value> = log_pass
        .frame_arrays()
        .iter()
        .map(|array| {
            let channels: Vec<serde_json::Value> = array
                .channels()
                .iter()
                .map(|channel| {
                    let values: Vec<f64> = (0..channel.array.len())
                        .filter_map(|i| channel.array.value_f64(i))
                        .collect();
                    serde_json::json!({
                        "channel": String::from_utf8_lossy(&channel.name.identifier),
                        "long_name": String::from_utf8_lossy(&channel.long_name),
                        "units": String::from_utf8_lossy(&channel.units),
                        "dimensions": channel.dimensions,
                        "rep_code": channel.rep_code,
                        "values": values,
                    })
                })
                .collect();
            serde_json::json!({
                "frame": array.name.to_string(),
                "frames_read": array.frames_read(),
                "channels": channels,
            })
        })
        .collect();
    serde_json::json!(arrays)
}
