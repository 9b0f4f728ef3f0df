use assert_cmd::Command;
use predicates::prelude::*;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write(dir: &Path, name: &str, text: &str) {
    fs::write(dir.join(name), text).unwrap();
}

fn gas_and_demand(dir: &Path) {
    write(
        dir,
        "model.toml",
        "country = \"CH\"\nfirst_year = 2020\nlast_year = 2022\nrepresentative_days = 2\nhour_slice = 6\n",
    );
    write(dir, "FiE.csv", "entity,elecsupply\ndem_elec,1\n");
    write(dir, "FoE.csv", "entity,elecsupply\nconv_elec_gas,1\n");
    write(
        dir,
        "conv.csv",
        "kind,parameter,flow,year,conv_elec_gas\n\
         configuration,enable_capacity,,,1\n\
         annual,actual_capacity,,2020,10\n\
         annual,actual_activity,,2020,100\n\
         constant,capacity_to_activity,,,8760\n\
         constant,cost_investment,,,1000\n\
         constant,cost_fixed_om_annual,,,20\n\
         constant,cost_variable_om,,,0.05\n",
    );
    write(
        dir,
        "dem.csv",
        "kind,parameter,flow,year,dem_elec\n\
         annual,actual_demand,,2020,100\n\
         annual,actual_demand,,2021,110\n\
         annual,actual_demand,,2022,120\n\
         constant,cost_variable_om,,,0\n",
    );
}

#[test]
fn build_prints_blocks() {
    let dir = tempdir().unwrap();
    gas_and_demand(dir.path());
    let mut cmd = Command::cargo_bin("restore").unwrap();
    cmd.args(["build", dir.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("c_io_balance"))
        .stdout(predicate::str::contains("tech_cap_transfer"));
}

#[test]
fn build_emits_json_summary() {
    let dir = tempdir().unwrap();
    gas_and_demand(dir.path());
    let output = Command::cargo_bin("restore")
        .unwrap()
        .args(["build", dir.path().to_str().unwrap(), "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["years"], 3);
    assert_eq!(summary["days"], 2);
    assert_eq!(summary["sets"]["Dems"], 1);
}

#[test]
fn build_reports_missing_value() {
    let dir = tempdir().unwrap();
    gas_and_demand(dir.path());
    write(
        dir.path(),
        "dem.csv",
        "kind,parameter,flow,year,dem_elec\n\
         annual,actual_demand,,2020,100\n\
         constant,cost_variable_om,,,0\n",
    );
    Command::cargo_bin("restore")
        .unwrap()
        .args(["build", dir.path().to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("actual_demand"));
}

#[cfg(feature = "solver-clarabel")]
#[test]
fn solve_writes_nonzero_values() {
    let dir = tempdir().unwrap();
    gas_and_demand(dir.path());
    let out = dir.path().join("solution.csv");
    Command::cargo_bin("restore")
        .unwrap()
        .args([
            "solve",
            dir.path().to_str().unwrap(),
            "--out",
            out.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("objective"));
    let text = fs::read_to_string(&out).unwrap();
    assert!(text.starts_with("variable,value"));
    assert!(text.contains("capacity_total[conv_elec_gas,2022]"));
}

#[test]
fn cluster_prints_ratios() {
    let dir = tempdir().unwrap();
    let mut csv = String::from("day");
    for h in 0..24 {
        write!(csv, ",{h}").unwrap();
    }
    csv.push('\n');
    for d in 0..365 {
        write!(csv, "{d}").unwrap();
        for h in 0..24 {
            let weekday = if d % 7 < 5 { 4.0 } else { 0.0 };
            let daytime = if (8..18).contains(&h) { 3.0 } else { 0.0 };
            write!(csv, ",{}", 5.0 + weekday + daytime + (d % 3) as f64 * 0.1).unwrap();
        }
        csv.push('\n');
    }
    let profile = dir.path().join("CH_2019.csv");
    fs::write(&profile, csv).unwrap();
    let out = dir.path().join("days.csv");

    Command::cargo_bin("restore")
        .unwrap()
        .args([
            "cluster",
            profile.to_str().unwrap(),
            "-k",
            "2",
            "--hour-slice",
            "6",
            "--total",
            "60000",
            "--out",
            out.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("RATIO"));
    let rows = fs::read_to_string(&out).unwrap();
    // header + 2 days x 4 slots
    assert_eq!(rows.lines().count(), 1 + 2 * 4);
}
