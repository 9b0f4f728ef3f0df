use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use restore_ts::{read_profile_csv, DemandClusterer, ProfileColumns, ProfileLibrary};
use tabwriter::TabWriter;
use tracing::info;

pub fn handle(
    profile: &Path,
    days: usize,
    hour_slice: usize,
    seed: u64,
    total: Option<f64>,
    out: Option<&Path>,
) -> Result<()> {
    let load = read_profile_csv(profile, ProfileColumns::AfterIndex)
        .with_context(|| format!("reading profile '{}'", profile.display()))?;
    let root = profile.parent().unwrap_or_else(|| Path::new("."));
    let clusterer = DemandClusterer::new(ProfileLibrary::new(root), days)
        .with_seed(seed)
        .with_hour_slice(hour_slice);
    info!("Clustering {} into {} representative days", profile.display(), days);
    let fit = clusterer.cluster_profile(&load)?;
    let annual = total.unwrap_or_else(|| fit.clustered_total());
    let demand = fit.correct_to_total(annual)?;

    let mut writer = TabWriter::new(io::stdout());
    writeln!(writer, "DAY\tRATIO\tDAYS/YEAR\tPEAK\tMEAN")?;
    for (d, (ratio, shape)) in demand.ratios.iter().zip(&demand.demand).enumerate() {
        let peak = shape.iter().copied().fold(f64::MIN, f64::max);
        let mean = shape.iter().sum::<f64>() / shape.len().max(1) as f64;
        writeln!(
            writer,
            "{d}\t{ratio:.4}\t{:.1}\t{peak:.3}\t{mean:.3}",
            ratio * 365.0
        )?;
    }
    writer.flush()?;
    println!("correction: {:.6}", demand.correction);
    if let Some(s) = fit.silhouette {
        println!("silhouette: {s:.3}");
    }

    if let Some(out) = out {
        let mut csv = csv::Writer::from_path(out).with_context(|| format!("creating '{}'", out.display()))?;
        csv.write_record(["day", "ratio", "slot", "demand"])?;
        for (d, (ratio, shape)) in demand.ratios.iter().zip(&demand.demand).enumerate() {
            for (slot, value) in shape.iter().enumerate() {
                csv.write_record([
                    d.to_string(),
                    ratio.to_string(),
                    (slot * demand.slot_hours).to_string(),
                    value.to_string(),
                ])?;
            }
        }
        csv.flush()?;
    }
    Ok(())
}
