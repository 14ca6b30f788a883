use detector::{
    classify,
    load_file,
    Fixture,
    Formula,
    LoadError,
    Omega1Result,
    Omega2Result,
    SecondClassifierSlot,
    SecondOutcome,
};
use log::{
    debug,
    error,
    info,
    LevelFilter,
};
use std::{
    fmt::{
        self,
        Write as _,
    },
    io::Write as _,
    path::PathBuf,
    process,
};
use structopt::StructOpt;
use thiserror::Error;

#[derive(StructOpt, Debug)]
#[structopt(
    name = "omega-detector",
    about = "Checks whether unit propagation alone refutes a CNF formula."
)]
struct Opt {
    /// The clause-list input file, e.g. a DIMACS `.cnf` file.
    #[structopt(name = "input .cnf file", parse(from_os_str))]
    input: Option<PathBuf>,

    /// Classifies a built-in fixture instead of a file.
    ///
    /// One of: prime, double-prime, triple-prime, hex.
    #[structopt(long, conflicts_with = "input .cnf file")]
    fixture: Option<Fixture>,

    /// Classifies all built-in fixtures.
    #[structopt(long, conflicts_with_all = &["input .cnf file", "fixture"])]
    all_fixtures: bool,

    /// Enables debug logging. Overridden by `RUST_LOG`.
    #[structopt(short, long)]
    verbose: bool,
}

#[derive(Debug, Error)]
enum DriverError {
    #[error("{0}")]
    Load(#[from] LoadError),
    #[error("no input given, provide a .cnf file, --fixture <name> or --all-fixtures")]
    MissingInput,
}

fn configure_logging(verbose: bool) {
    let level_filter = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    env_logger::Builder::new()
        .format(|buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()))
        .filter_level(level_filter)
        .parse_env("RUST_LOG")
        .init();
    info!("Logging successfully configured");
}

/// Writes an optional value or `-` if absent.
fn or_dash<T: fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |value| value.to_string())
}

fn render_reasons(out: &mut String, reasons: &[String]) -> fmt::Result {
    if reasons.is_empty() {
        return Ok(())
    }
    writeln!(out, "Reasons")?;
    for reason in reasons {
        writeln!(out, "  - {}", reason)?;
    }
    Ok(())
}

fn render_omega1(out: &mut String, result: &Omega1Result) -> fmt::Result {
    writeln!(out, "Ω1 Result")?;
    writeln!(out, "  is_omega1: {}", result.is_omega1())?;
    writeln!(out, "  witness_seed: {}", or_dash(result.witness_seed()))?;
    writeln!(out, "  witness_literal: {}", or_dash(result.witness_literal()))?;
    writeln!(out, "  witness_depth: {}", or_dash(result.witness_depth()))?;
    writeln!(out, "  conflict_kind: {}", result.conflict_kind())?;
    render_reasons(out, result.reasons())?;
    let path = result.witness_path();
    if !path.is_empty() {
        let path = path
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(out, "Witness Path")?;
        writeln!(out, "  [{}]", path)?;
    }
    Ok(())
}

fn render_omega2(out: &mut String, result: &Omega2Result) -> fmt::Result {
    writeln!(out, "Ω2 Result")?;
    writeln!(out, "  is_omega2: {}", result.is_omega2)?;
    writeln!(out, "  screened_singletons: {}", result.screened_singletons)?;
    let pair = result.witness_pair.map(|(a, b)| format!("({}, {})", a, b));
    writeln!(out, "  witness_pair: {}", or_dash(pair))?;
    writeln!(out, "  conflict_kind: {}", result.conflict_kind)?;
    writeln!(out, "  flow_depth: {}", result.flow_depth)?;
    render_reasons(out, &result.reasons)
}

/// Renders the report for a single formula.
fn render_report(
    formula: &Formula,
    second: &SecondClassifierSlot,
) -> Result<String, fmt::Error> {
    let mut out = String::new();
    render_omega1(&mut out, &classify(formula))?;
    match second.run(formula) {
        SecondOutcome::Unavailable => writeln!(out, "Ω2 module not present.")?,
        SecondOutcome::Failed(failure) => writeln!(out, "Ω2 failed: {}", failure.message())?,
        SecondOutcome::Classified(result) => render_omega2(&mut out, &result)?,
    }
    Ok(out)
}

fn print_report(title: &str, formula: &Formula, second: &SecondClassifierSlot) {
    debug!(
        "classifying {} with {} clauses over {} variables",
        title,
        formula.len_clauses(),
        formula.len_variables()
    );
    println!("== {}", title);
    match render_report(formula, second) {
        Ok(report) => print!("{}", report),
        Err(_) => error!("failed to render report for {}", title),
    }
}

fn run(opt: Opt) -> Result<(), DriverError> {
    let second = SecondClassifierSlot::Absent;
    if opt.all_fixtures {
        for fixture in Fixture::ALL {
            print_report(fixture.label(), &fixture.formula(), &second);
        }
        return Ok(())
    }
    if let Some(fixture) = opt.fixture {
        print_report(fixture.label(), &fixture.formula(), &second);
        return Ok(())
    }
    let input = opt.input.ok_or(DriverError::MissingInput)?;
    let formula = load_file(&input)?;
    print_report(&input.display().to_string(), &formula, &second);
    Ok(())
}

fn main() {
    let opt = Opt::from_args();
    configure_logging(opt.verbose);
    if let Err(err) = run(opt) {
        error!("{}", err);
        eprintln!("error: {}", err);
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use detector::{
        load,
        CollaboratorFailure,
    };

    #[test]
    fn report_unit_conflict() {
        let formula = load("1 0\n-1 0\n").unwrap();
        let report = render_report(&formula, &SecondClassifierSlot::Absent).unwrap();
        assert_eq!(
            report,
            "Ω1 Result\n  \
             is_omega1: true\n  \
             witness_seed: 1\n  \
             witness_literal: 1\n  \
             witness_depth: 1\n  \
             conflict_kind: unit_conflict\n\
             Reasons\n  \
             - unit propagation derives a contradiction (empty clause)\n\
             Witness Path\n  \
             [1]\n\
             Ω2 module not present.\n"
        );
    }

    #[test]
    fn report_inconclusive_has_no_path() {
        let formula = Fixture::TriplePrime.formula();
        let report = render_report(&formula, &SecondClassifierSlot::Absent).unwrap();
        assert!(report.contains("is_omega1: false"));
        assert!(report.contains("witness_seed: -"));
        assert!(report.contains("witness_depth: -"));
        assert!(report.contains("conflict_kind: none"));
        assert!(!report.contains("Witness Path"));
    }

    #[test]
    fn report_survives_second_classifier_failure() {
        let second = SecondClassifierSlot::present(
            |_: &Formula| -> Result<Omega2Result, CollaboratorFailure> {
                Err(CollaboratorFailure::new("boom"))
            },
        );
        let formula = load("0\n").unwrap();
        let report = render_report(&formula, &second).unwrap();
        assert!(report.contains("witness_depth: 0"));
        assert!(report.contains("conflict_kind: empty_clause"));
        assert!(report.ends_with("Ω2 failed: boom\n"));
    }

    #[test]
    fn missing_input_fails() {
        let opt = Opt {
            input: None,
            fixture: None,
            all_fixtures: false,
            verbose: false,
        };
        assert!(matches!(run(opt), Err(DriverError::MissingInput)));
    }
}
