pub mod export;

pub use self::export::{write_history_csv, write_training_csv};

use comfy_table::presets::ASCII_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use rfsizer::allowable::AllowableFit;
use rfsizer::evaluator::{EvaluationResult, RfStatus, RF_NO_STRESS};
use rfsizer::model::{DesignVector, StructuralModel};
use rfsizer::optimizer::IterationRecord;

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn right_align(table: &mut Table, from: usize, to: usize) {
    for i in from..=to {
        if let Some(col) = table.column_mut(i) {
            col.set_cell_alignment(CellAlignment::Right);
        }
    }
}

fn rf_cell(rf: f64, status: RfStatus) -> Cell {
    let cell = Cell::new(format!("{:.3}", rf));
    match status {
        RfStatus::Pass => cell.fg(Color::Green),
        RfStatus::Fail => cell.fg(Color::Red),
        RfStatus::NoStress | RfStatus::NoAllowable => cell.fg(Color::DarkGrey),
    }
}

pub fn print_fit_table<'a>(label: &str, fits: impl Iterator<Item = (u32, &'a AllowableFit)>) {
    let mut table = new_table();
    table.add_row(vec![
        Cell::new(label).add_attribute(Attribute::Bold),
        Cell::new("a"),
        Cell::new("b"),
        Cell::new("r²"),
        Cell::new("Samples"),
        Cell::new("Used"),
        Cell::new("Status"),
    ]);
    right_align(&mut table, 1, 5);

    for (id, fit) in fits {
        let status = match fit.reason {
            Some(reason) => Cell::new(format!("EXCLUDED ({})", reason)).fg(Color::Yellow),
            None => Cell::new("OK").fg(Color::Green),
        };
        table.add_row(vec![
            Cell::new(id).add_attribute(Attribute::Bold),
            Cell::new(format!("{:.4}", fit.a)),
            Cell::new(format!("{:.4}", fit.b)),
            Cell::new(format!("{:.3}", fit.r2)),
            Cell::new(fit.sample_count),
            Cell::new(fit.fit_points),
            status,
        ]);
    }
    println!("\n{}", table);
}

pub fn print_element_table(result: &EvaluationResult) {
    let mut table = new_table();
    table.add_row(vec![
        Cell::new("Element").add_attribute(Attribute::Bold),
        Cell::new("Property"),
        Cell::new("t"),
        Cell::new("Stress"),
        Cell::new("Case"),
        Cell::new("Allowable"),
        Cell::new("RF").fg(Color::Cyan),
        Cell::new("Status"),
    ]);
    right_align(&mut table, 1, 6);

    for e in &result.elements {
        table.add_row(vec![
            Cell::new(e.element).add_attribute(Attribute::Bold),
            Cell::new(e.property),
            Cell::new(format!("{:.3}", e.thickness)),
            Cell::new(format!("{:.2}", e.stress)),
            Cell::new(e.governing.map_or("-".to_string(), |g| g.to_string())),
            Cell::new(e.allowable.map_or("-".to_string(), |a| format!("{:.2}", a))),
            rf_cell(e.rf, e.status),
            Cell::new(e.status),
        ]);
    }
    println!("\n{}", table);
}

pub fn print_property_table(
    model: &StructuralModel,
    design: &DesignVector,
    result: &EvaluationResult,
    target_rf: f64,
) {
    let mut table = new_table();
    table.add_row(vec![
        Cell::new("Property").add_attribute(Attribute::Bold),
        Cell::new("Kind"),
        Cell::new("Value"),
        Cell::new("Bounds"),
        Cell::new("Elements"),
        Cell::new("Min RF").fg(Color::Cyan),
    ]);
    right_align(&mut table, 2, 5);

    for p in model.properties() {
        let rf = result.property_rf(p.id);
        let status = match rf {
            Some(rf) if rf >= RF_NO_STRESS => RfStatus::NoStress,
            Some(rf) if rf >= target_rf => RfStatus::Pass,
            Some(_) => RfStatus::Fail,
            None => RfStatus::NoAllowable,
        };
        table.add_row(vec![
            Cell::new(p.id).add_attribute(Attribute::Bold),
            Cell::new(p.kind.label()),
            Cell::new(design.get(p.id).map_or("-".to_string(), |v| format!("{:.3}", v))),
            Cell::new(format!("[{}, {}]", p.lower_bound, p.upper_bound)),
            Cell::new(model.elements_of(p.id).count()),
            match rf {
                Some(rf) => rf_cell(rf, status),
                None => Cell::new("-").fg(Color::DarkGrey),
            },
        ]);
    }
    println!("\n{}", table);
}

pub fn print_evaluation_summary(result: &EvaluationResult, target_rf: f64, tolerance: f64) {
    let d = &result.diagnostics;
    println!(
        "\nMin RF: {} | failing: {} | passing: {} | weight: {:.4} | feasible: {}",
        result.min_rf.map_or("n/a".to_string(), |rf| format!("{:.3}", rf)),
        result.failing,
        result.passing,
        result.total_weight,
        if result.is_feasible(target_rf, tolerance) { "yes" } else { "no" }
    );
    if let Some(critical) = result.critical_element() {
        println!(
            "Critical element: {} (property {}, RF {:.3})",
            critical.element, critical.property, critical.rf
        );
    }
    if d.no_allowable + d.unknown_elements + d.missing_stress + d.uncombined + d.unresolved_density > 0 {
        println!(
            "⚠️  Data caveats: {} NO_ALLOW, {} unknown elements, {} without stress, {} uncombined, {} default densities",
            d.no_allowable, d.unknown_elements, d.missing_stress, d.uncombined, d.unresolved_density
        );
    }
}

pub fn print_history_table(history: &[IterationRecord]) {
    let mut table = new_table();
    table.add_row(vec![
        Cell::new("Iter").add_attribute(Attribute::Bold),
        Cell::new("Min RF").fg(Color::Cyan),
        Cell::new("Failing"),
        Cell::new("Weight"),
        Cell::new("Feasible"),
    ]);
    right_align(&mut table, 0, 3);

    for r in history {
        if !r.evaluated {
            table.add_row(vec![
                Cell::new(r.iteration),
                Cell::new("FAILED").fg(Color::Red),
                Cell::new("-"),
                Cell::new("-"),
                Cell::new("-"),
            ]);
            continue;
        }
        let weight = Cell::new(r.weight.map_or("-".to_string(), |w| format!("{:.4}", w)));
        table.add_row(vec![
            Cell::new(r.iteration),
            Cell::new(r.min_rf.map_or("n/a".to_string(), |rf| format!("{:.3}", rf))),
            Cell::new(r.failing.unwrap_or(0)),
            if r.new_best { weight.add_attribute(Attribute::Bold).fg(Color::Green) } else { weight },
            Cell::new(if r.feasible { "yes" } else { "no" }),
        ]);
    }
    println!("\n{}", table);
}
