//! Report tables using comfy-table.

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, ContentArrangement, Table};
use queuesim::{PipelineReport, StageSnapshot, format_count, ns_to_sec};

fn styled_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            header
                .iter()
                .map(|h| Cell::new(h).add_attribute(Attribute::Bold)),
        );
    table
}

fn us_cell(value: Option<u64>) -> Cell {
    let text = value.map_or_else(|| "-".to_string(), |v| format!("{v} us"));
    Cell::new(text).set_alignment(CellAlignment::Right)
}

fn number_cell(text: String) -> Cell {
    Cell::new(text).set_alignment(CellAlignment::Right)
}

/// Plain table of pre-rendered rows.
pub fn text_table(header: &[&str], rows: &[Vec<String>]) -> Table {
    let mut table = styled_table(header);
    for row in rows {
        table.add_row(row);
    }
    table
}

/// End-to-end latency at the reported percentiles.
pub fn latency_table(report: &PipelineReport) -> Table {
    let mut table = styled_table(&["p10", "p50", "p90", "p99", "p100"]);
    let latency = &report.latency;
    table.add_row(vec![
        us_cell(latency.p10_us),
        us_cell(latency.p50_us),
        us_cell(latency.p90_us),
        us_cell(latency.p99_us),
        us_cell(latency.p100_us),
    ]);
    table
}

fn stage_row(stage: &StageSnapshot) -> Vec<Cell> {
    let (workers, load) = match &stage.workers {
        Some(workers) => (
            format!("{}/{}", workers.busy, workers.slots),
            workers
                .load_average
                .map_or_else(|| "-".to_string(), |load| format!("{:.0}%", load * 100.0)),
        ),
        None => ("-".to_string(), "-".to_string()),
    };

    vec![
        Cell::new(&stage.name),
        Cell::new(format!("{:?}", stage.kind)),
        number_cell(format_count(stage.occupancy as u64)),
        number_cell(format_count(stage.released)),
        us_cell(stage.stage_time_p90_us),
        number_cell(workers),
        number_cell(load),
    ]
}

/// One row per stage, head first.
pub fn stage_table(report: &PipelineReport) -> Table {
    let mut table = styled_table(&[
        "Stage", "Kind", "In stage", "Released", "p90", "Workers", "Load",
    ]);
    for stage in &report.stages {
        table.add_row(stage_row(stage));
    }
    table
}

/// Prints the summary line and both tables.
pub fn print_report(report: &PipelineReport, seed: u64) {
    println!(
        "TimePassed: {:.2} s, Events: {}, AvgRPS: {:.0}, InFlight: {}, Seed: {seed}",
        ns_to_sec(report.elapsed_ns),
        format_count(report.completed),
        report.throughput,
        report.population,
    );
    println!("{}", latency_table(report));
    println!("{}", stage_table(report));
}

#[cfg(test)]
mod tests {
    use super::*;
    use queuesim::{Pipeline, PipelineConfig, StageSpec, us_to_ns};

    fn report() -> PipelineReport {
        let mut pipeline = Pipeline::new(
            PipelineConfig::default(),
            vec![
                StageSpec::queue("InputQ", 2),
                StageSpec::fixed_pool("Disk", 2, us_to_ns(4)),
                StageSpec::ordering_barrier("Flush"),
            ],
        )
        .expect("valid topology");
        pipeline.run_ticks(100, us_to_ns(1));
        pipeline.report()
    }

    #[test]
    fn stage_table_lists_every_stage() {
        let text = stage_table(&report()).to_string();
        assert!(text.contains("InputQ"));
        assert!(text.contains("Disk"));
        assert!(text.contains("Flush"));
        assert!(text.contains("FixedPool"));
    }

    #[test]
    fn latency_table_has_values() {
        let text = latency_table(&report()).to_string();
        assert!(text.contains("p99"));
        assert!(text.contains(" us"));
    }
}
