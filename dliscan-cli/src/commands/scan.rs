use anyhow::{Context, Result};
use dliscan_core::eflr::ExplicitlyFormattedLogicalRecord;
use dliscan_core::framing::RecordReader;
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::BufReader;
use tracing::{info, warn};

#[derive(Serialize, Deserialize)]
struct RecordSummary {
    vr_position: u64,
    lrsh_position: u64,
    lr_type: u8,
    eflr: bool,
    encrypted: bool,
    length: usize,
    set_type: Option<String>,
}

pub fn execute(input: &str, output: Option<&str>, keep_going: bool) -> Result<()> {
    info!("Scanning file: {}", input);

    let file_length = fs::metadata(input)
        .with_context(|| format!("Failed to stat input file: {}", input))?
        .len();
    let file = File::open(input).with_context(|| format!("Failed to open input file: {}", input))?;
    let mut reader = RecordReader::new(BufReader::new(file))
        .with_context(|| format!("Not an RP66V1 file: {}", input))?;

    let sul = reader.storage_unit_label().clone();
    info!(
        "Storage unit {} ({}), max record length {}",
        sul.sequence_number, sul.dlis_version, sul.maximum_record_length
    );

    let progress = ProgressBar::new(file_length);
    progress.set_style(ProgressStyle::with_template(
        "{bar:40} {bytes}/{total_bytes} {msg}",
    )?);

    let mut summaries = Vec::new();
    let mut eflr_count = 0usize;
    let mut iflr_count = 0usize;
    let mut encrypted_count = 0usize;
    let mut parse_failures = 0usize;
    loop {
        let mut record = match reader.next_record() {
            Ok(Some(record)) => record,
            Ok(None) => break,
            Err(err) => {
                // The next record's offset is gone with the broken chain, so
                // a framing error always ends the scan.
                if keep_going {
                    warn!("Scan stopped early: {err}");
                    break;
                }
                return Err(err).with_context(|| format!("Broken record stream in {}", input));
            }
        };
        progress.set_position(record.position.lrsh_position);

        let mut set_type = None;
        if record.is_encrypted {
            encrypted_count += 1;
        } else if record.is_eflr {
            eflr_count += 1;
            match ExplicitlyFormattedLogicalRecord::parse(record.lr_type, &mut record.data) {
                Ok(eflr) => {
                    set_type = Some(String::from_utf8_lossy(&eflr.set.set_type).to_string());
                }
                Err(err) => {
                    parse_failures += 1;
                    if !keep_going {
                        return Err(err).with_context(|| {
                            format!(
                                "Undecodable EFLR at 0x{:x} in {}",
                                record.position.lrsh_position, input
                            )
                        });
                    }
                    warn!(
                        "Skipping undecodable EFLR at 0x{:x}: {err}",
                        record.position.lrsh_position
                    );
                }
            }
        } else {
            iflr_count += 1;
        }
        summaries.push(RecordSummary {
            vr_position: record.position.vr_position,
            lrsh_position: record.position.lrsh_position,
            lr_type: record.lr_type,
            eflr: record.is_eflr,
            encrypted: record.is_encrypted,
            length: record.data.len(),
            set_type,
        });
    }
    progress.finish_and_clear();

    println!("\n=== Scan Results ===");
    println!("Logical Records:   {}", summaries.len());
    println!("EFLR:              {}", eflr_count);
    println!("IFLR:              {}", iflr_count);
    println!("Encrypted:         {}", encrypted_count);
    println!("Parse failures:    {}", parse_failures);
    println!();

    if let Some(output_path) = output {
        let json = serde_json::to_string_pretty(&summaries)
            .with_context(|| "Failed to serialize record summaries")?;
        fs::write(output_path, json)
            .with_context(|| format!("Failed to write output file: {}", output_path))?;
        info!("Record summary written to: {}", output_path);
    } else {
        for summary in &summaries {
            println!(
                "0x{:08x} type {:3} {} {}{}",
                summary.lrsh_position,
                summary.lr_type,
                if summary.eflr { "EFLR" } else { "IFLR" },
                summary.set_type.as_deref().unwrap_or("-"),
                if summary.encrypted { " (encrypted)" } else { "" },
            );
        }
    }

    Ok(())
}
