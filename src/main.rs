use ixa_contagion::runner::run_with_args;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let session = run_with_args(|_, _, _| Ok(()))?;

    let simulation = session.simulation();
    let report = simulation.current_report();
    println!(
        "day {}: {} active, {} cumulative, {} dead, {} immune{}",
        report.day,
        report.total_cases,
        report.cumulative_cases,
        report.total_deaths,
        report.total_immune,
        if simulation.is_over() { " (outbreak over)" } else { "" }
    );
    Ok(())
}
