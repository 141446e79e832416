use crate::commands::{render_value, value_to_json};
use anyhow::{Context, Result};
use colored::Colorize;
use dliscan_core::eflr::ExplicitlyFormattedLogicalRecord;
use dliscan_core::framing::RecordReader;
use std::fs::{self, File};
use std::io::BufReader;
use tracing::{info, warn};

pub fn execute(input: &str, set_type: Option<&str>, output: Option<&str>) -> Result<()> {
    info!("Dumping EFLR metadata from: {}", input);

    let file = File::open(input).with_context(|| format!("Failed to open input file: {}", input))?;
    let reader = RecordReader::new(BufReader::new(file))
        .with_context(|| format!("Not an RP66V1 file: {}", input))?;

    let mut records = Vec::new();
    for record in reader {
        let mut record = record.with_context(|| format!("Broken record stream in {}", input))?;
        if !record.is_eflr {
            continue;
        }
        if record.is_encrypted {
            warn!(
                "Skipping encrypted EFLR at 0x{:x}, starts 0x{}",
                record.position.lrsh_position,
                hex::encode(&record.data.as_slice()[..record.data.len().min(8)])
            );
            continue;
        }
        let eflr = ExplicitlyFormattedLogicalRecord::parse(record.lr_type, &mut record.data)
            .with_context(|| {
                format!(
                    "Undecodable EFLR at 0x{:x} in {}",
                    record.position.lrsh_position, input
                )
            })?;
        if let Some(wanted) = set_type {
            if eflr.set.set_type.as_ref() != wanted.as_bytes() {
                continue;
            }
        }
        records.push(eflr);
    }

    if let Some(output_path) = output {
        let json = serde_json::to_string_pretty(&records.iter().map(eflr_to_json).collect::<Vec<_>>())
            .with_context(|| "Failed to serialize EFLR records")?;
        fs::write(output_path, json)
            .with_context(|| format!("Failed to write output file: {}", output_path))?;
        info!("EFLR dump written to: {}", output_path);
        return Ok(());
    }

    for eflr in &records {
        print_eflr(eflr);
    }
    println!("{} EFLR record(s)", records.len());
    Ok(())
}

fn print_eflr(eflr: &ExplicitlyFormattedLogicalRecord) {
    let set_type = String::from_utf8_lossy(&eflr.set.set_type).to_string();
    match &eflr.set.name {
        Some(name) => println!(
            "{} {} ({})",
            "Set".bold(),
            set_type.green().bold(),
            String::from_utf8_lossy(name)
        ),
        None => println!("{} {}", "Set".bold(), set_type.green().bold()),
    }
    for object in eflr.objects() {
        println!("  {}", object.name.to_string().cyan());
        for (template, attr) in eflr.template.attributes().iter().zip(object.attributes()) {
            let label = String::from_utf8_lossy(&template.label).to_string();
            match attr {
                None => println!("    {:24} {}", label, "absent".dimmed()),
                Some(attr) => {
                    let values: Vec<String> = attr.values.iter().map(render_value).collect();
                    let units = if attr.units.is_empty() {
                        String::new()
                    } else {
                        format!(" [{}]", String::from_utf8_lossy(&attr.units))
                    };
                    println!("    {:24} {}{}", label, values.join(", "), units);
                }
            }
        }
    }
    println!();
}

fn eflr_to_json(eflr: &ExplicitlyFormattedLogicalRecord) -> serde_json::Value {
    let objects: Vec<serde_json::Value> = eflr
        .objects()
        .iter()
        .map(|object| {
            let attrs: serde_json::Map<String, serde_json::Value> = eflr
                .template
                .attributes()
                .iter()
                .zip(object.attributes())
                .map(|(template, attr)| {
                    let label = String::from_utf8_lossy(&template.label).to_string();
                    let value = match attr {
                        None => serde_json::Value::Null,
                        Some(attr) => serde_json::json!({
                            "units": String::from_utf8_lossy(&attr.units),
                            "values": attr.values.iter().map(value_to_json).collect::<Vec<_>>(),
                        }),
                    };
                    (label, value)
                })
                .collect();
            serde_json::json!({
                "name": object.name.to_string(),
                "attributes": attrs,
            })
        })
        .collect();
    serde_json::json!({
        "lr_type": eflr.lr_type,
        "set_type": String::from_utf8_lossy(&eflr.set.set_type),
        "set_name": eflr.set.name.as_ref().map(|n| String::from_utf8_lossy(n).to_string()),
        "objects": objects,
    })
}
