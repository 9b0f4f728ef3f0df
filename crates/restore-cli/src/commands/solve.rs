use std::path::Path;

use anyhow::Result;

#[cfg(feature = "solver-clarabel")]
pub fn handle(dir: &Path, out: Option<&Path>, tolerance: f64, zero: f64) -> Result<()> {
    use anyhow::Context;
    use restore_algo::{build_model, solve, SolveOptions};
    use tracing::info;

    let inputs = super::load(dir)?;
    let assembled = build_model(&inputs.store, inputs.incidence, &inputs.settings)
        .context("assembling model")?;
    let options = SolveOptions::default().with_tolerance(tolerance);
    let solution = solve(&assembled, &options).context("solving model")?;

    println!("objective: {:.6}", solution.objective);
    println!("max violation: {:.3e}", solution.max_violation);
    for (sector, cost) in &assembled.sector_costs {
        let value = cost.eval(|v| Some(solution.value(v)));
        println!("  {sector:<12} {value:>16.6}");
    }

    if let Some(out) = out {
        let mut writer = csv::Writer::from_path(out)
            .with_context(|| format!("creating '{}'", out.display()))?;
        writer.write_record(["variable", "value"])?;
        let rows = solution.nonzero(zero);
        for (name, value) in &rows {
            writer.write_record([*name, value.to_string().as_str()])?;
        }
        writer.flush()?;
        info!(rows = rows.len(), path = %out.display(), "wrote solution");
    }
    Ok(())
}

#[cfg(not(feature = "solver-clarabel"))]
pub fn handle(_dir: &Path, _out: Option<&Path>, _tolerance: f64, _zero: f64) -> Result<()> {
    anyhow::bail!("built without a solver backend; enable the `solver-clarabel` feature")
}
