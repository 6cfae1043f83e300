use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::engine::Simulation;
use crate::error::ContagionError;
use crate::loader::load_edge_list;
use crate::log::{info, set_log_level, set_module_filter, LevelFilter};
use crate::parameters::{ParameterSet, SharedParameters};
use crate::random::SeededRandom;
use crate::report::{CsvReport, StepReport, StepSink};
use crate::status::Day;
use clap::{ArgAction, Args, Command, FromArgMatches as _};

/// Name of the report written to `--output-dir`.
pub const DAILY_REPORT: &str = "daily.csv";

/// Prior days an interactive session keeps for `rewind`.
pub const CONSOLE_HISTORY_DAYS: usize = 365;

/// Default cli arguments for the contagion runner
#[derive(Args, Debug, Clone)]
pub struct BaseArgs {
    /// Edge list to load the graph from (CSV with a `v1,v2` header)
    #[arg(short, long)]
    pub edges: PathBuf,

    /// Vertex infected on day 0. Defaults to the first vertex of the edge list
    #[arg(short, long)]
    pub seed_vertex: Option<String>,

    /// Random seed
    #[arg(short, long, default_value = "0")]
    pub random_seed: u64,

    /// Optional path for a JSON parameter file
    #[arg(short, long, default_value = "")]
    pub config: String,

    /// Optional directory for the daily report
    #[arg(short, long, default_value = "")]
    pub output_dir: String,

    /// Pause between automatic steps, e.g. `250ms` or `1s`
    #[arg(long, default_value = "0s", value_parser = humantime::parse_duration)]
    pub delay: Duration,

    /// Stop automatic runs after this many days
    #[arg(short, long)]
    pub max_days: Option<Day>,

    /// Enable logging: a level (`debug`), or module filters (`ixa_contagion::frontier=trace`),
    /// comma separated
    #[arg(long)]
    pub log_level: Option<String>,

    /// Increase logging verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Start the operator console instead of running automatically
    #[arg(short, long)]
    pub interactive: bool,
}

impl BaseArgs {
    /// Arguments for loading `edges` with every other option at its default.
    #[must_use]
    pub fn new(edges: impl Into<PathBuf>) -> Self {
        BaseArgs {
            edges: edges.into(),
            seed_vertex: None,
            random_seed: 0,
            config: String::new(),
            output_dir: String::new(),
            delay: Duration::ZERO,
            max_days: None,
            log_level: None,
            verbose: 0,
            interactive: false,
        }
    }
}

#[derive(Args)]
pub struct PlaceholderCustom {}

fn create_contagion_cli() -> Command {
    let cli = Command::new("contagion");
    BaseArgs::augment_args(cli)
}

/// Why an automatic run stopped.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// Nothing is infected or quarantined any more.
    OutbreakOver,
    DayLimit,
    /// The stop signal was raised.
    Stopped,
}

/// The result of [`AutoRunner::run`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RunOutcome {
    pub days_run: Day,
    pub reason: StopReason,
}

/// Steps a [`Simulation`] repeatedly until it is over, a day limit is reached, or it is told
/// to stop.
///
/// The parameters are read through a [`SharedParameters`] handle once at the start of every
/// step, so changes made from elsewhere apply from the next day. The stop signal is checked
/// at the top of every iteration; a step in progress always completes.
#[derive(Clone, Debug)]
pub struct AutoRunner {
    parameters: SharedParameters,
    stop: Arc<AtomicBool>,
    delay: Duration,
    max_days: Option<Day>,
}

impl AutoRunner {
    #[must_use]
    pub fn new(parameters: SharedParameters) -> Self {
        AutoRunner {
            parameters,
            stop: Arc::new(AtomicBool::new(false)),
            delay: Duration::ZERO,
            max_days: None,
        }
    }

    /// Waits `delay` between two steps. There is no wait before the first step.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Limits a single [`AutoRunner::run`] to `max_days` steps.
    #[must_use]
    pub fn with_max_days(mut self, max_days: Option<Day>) -> Self {
        self.max_days = max_days;
        self
    }

    /// The flag that stops the loop when set. Clearing it again is up to the caller.
    #[must_use]
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    #[must_use]
    pub fn parameters(&self) -> &SharedParameters {
        &self.parameters
    }

    /// Runs steps until one of the stop conditions holds, handing every report to `sink`.
    ///
    /// # Errors
    ///
    /// Returns the first error of a step or of the sink. Steps completed before it are kept.
    pub fn run<S: StepSink + ?Sized>(
        &self,
        simulation: &mut Simulation,
        rng: &mut SeededRandom,
        sink: &mut S,
    ) -> Result<RunOutcome, ContagionError> {
        let mut days_run: Day = 0;
        let reason = loop {
            if self.stop.load(Ordering::Relaxed) {
                break StopReason::Stopped;
            }
            if simulation.is_over() {
                break StopReason::OutbreakOver;
            }
            if self.max_days.is_some_and(|max_days| days_run >= max_days) {
                break StopReason::DayLimit;
            }
            if days_run > 0 && !self.delay.is_zero() {
                thread::sleep(self.delay);
            }

            let parameters = self.parameters.snapshot();
            let report = simulation.step(&parameters, rng)?;
            sink.record(&report, simulation.state())?;
            days_run += 1;
        };

        info!(
            "automatic run stopped after {days_run} days on day {} ({reason:?})",
            simulation.state().day()
        );
        Ok(RunOutcome { days_run, reason })
    }
}

/// Everything a run needs: the simulation, its random stream, the live parameters and the
/// sinks that receive each day's report.
pub struct Session {
    simulation: Simulation,
    rng: SeededRandom,
    runner: AutoRunner,
    sinks: Vec<Box<dyn StepSink>>,
}

impl Session {
    #[must_use]
    pub fn new(simulation: Simulation, parameters: ParameterSet, random_seed: u64) -> Self {
        Session {
            simulation,
            rng: SeededRandom::new(random_seed),
            runner: AutoRunner::new(SharedParameters::new(parameters)),
            sinks: Vec::new(),
        }
    }

    #[must_use]
    pub fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    pub fn simulation_mut(&mut self) -> &mut Simulation {
        &mut self.simulation
    }

    /// The live parameter handle. Clones of it see and make the same changes.
    #[must_use]
    pub fn parameters(&self) -> &SharedParameters {
        self.runner.parameters()
    }

    #[must_use]
    pub fn runner(&self) -> &AutoRunner {
        &self.runner
    }

    pub fn set_runner(&mut self, runner: AutoRunner) {
        self.runner = runner;
    }

    pub fn add_sink(&mut self, sink: Box<dyn StepSink>) {
        self.sinks.push(sink);
    }

    /// Runs a single step with the current parameters.
    ///
    /// # Errors
    ///
    /// Returns the error of the step or of a sink.
    pub fn step(&mut self) -> Result<StepReport, ContagionError> {
        let parameters = self.parameters().snapshot();
        let report = self.simulation.step(&parameters, &mut self.rng)?;
        self.sinks.record(&report, self.simulation.state())?;
        Ok(report)
    }

    /// Goes back to the previous day and has every sink forget the days after it. Returns
    /// `false` when the simulation keeps no earlier day.
    ///
    /// # Errors
    ///
    /// Returns the first error of a sink. The simulation has been rewound by then.
    pub fn rewind(&mut self) -> Result<bool, ContagionError> {
        if !self.simulation.rewind() {
            return Ok(false);
        }
        self.sinks.rewind(self.simulation.state().day())?;
        Ok(true)
    }

    /// Runs automatically with the configured runner.
    ///
    /// # Errors
    ///
    /// See [`AutoRunner::run`].
    pub fn run_auto(&mut self) -> Result<RunOutcome, ContagionError> {
        self.runner
            .run(&mut self.simulation, &mut self.rng, &mut self.sinks)
    }

    /// Runs automatically for at most `days` steps, whatever limit the runner has.
    ///
    /// # Errors
    ///
    /// See [`AutoRunner::run`].
    pub fn run_auto_for(&mut self, days: Option<Day>) -> Result<RunOutcome, ContagionError> {
        let runner = self.runner.clone().with_max_days(days);
        runner.run(&mut self.simulation, &mut self.rng, &mut self.sinks)
    }
}

fn parse_level(level: &str) -> Result<LevelFilter, ContagionError> {
    level
        .parse()
        .map_err(|_| ContagionError::ContagionError(format!("unknown log level `{level}`")))
}

/// Applies a `--log-level` value: a global level, `module=level` filters, or both, separated
/// by commas.
fn apply_log_level(spec: &str) -> Result<(), ContagionError> {
    for part in spec.split(',').map(str::trim).filter(|part| !part.is_empty()) {
        match part.split_once('=') {
            Some((module, level)) => {
                let level = parse_level(level)?;
                set_module_filter(module, level);
                println!("Logging enabled for {module} at level {level}");
            }
            None => set_log_level(parse_level(part)?),
        }
    }
    Ok(())
}

fn verbosity_level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Off,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Runs a simulation with custom cli arguments.
///
/// This function allows you to define custom arguments and a setup function
///
/// # Parameters
/// - `setup_fn`: A function that takes a mutable reference to a `Session`, a `BaseArgs` struct,
///   an Option<A> where A is the custom cli arguments struct
///
/// # Errors
/// Returns an error if argument parsing, loading or the setup function fails
pub fn run_with_custom_args<A, F>(setup_fn: F) -> Result<Session, Box<dyn std::error::Error>>
where
    A: Args,
    F: Fn(&mut Session, BaseArgs, Option<A>) -> Result<(), ContagionError>,
{
    let mut cli = create_contagion_cli();
    cli = A::augment_args(cli);
    let matches = cli.get_matches();

    let base_args_matches = BaseArgs::from_arg_matches(&matches)?;
    let custom_matches = A::from_arg_matches(&matches)?;
    run_with_args_internal(base_args_matches, Some(custom_matches), setup_fn)
}

/// Runs a simulation with default cli arguments
///
/// This function parses command line arguments and allows you to define a setup function
///
/// # Errors
/// Returns an error if argument parsing, loading or the setup function fails
pub fn run_with_args<F>(setup_fn: F) -> Result<Session, Box<dyn std::error::Error>>
where
    F: Fn(&mut Session, BaseArgs, Option<PlaceholderCustom>) -> Result<(), ContagionError>,
{
    let cli = create_contagion_cli();
    let matches = cli.get_matches();

    let base_args_matches = BaseArgs::from_arg_matches(&matches)?;
    run_with_args_internal(base_args_matches, None, setup_fn)
}

/// Builds the session described by `args` without running it.
///
/// # Errors
/// Returns an error if the edge list, the parameter file or the seed vertex is unusable, or
/// the report cannot be created.
pub fn build_session(args: &BaseArgs) -> Result<Session, ContagionError> {
    let graph = load_edge_list(&args.edges)?;

    // Optionally read parameters from a file
    let parameters = if args.config.is_empty() {
        ParameterSet::default()
    } else {
        println!("Loading parameters from: {}", args.config);
        ParameterSet::from_json_file(Path::new(&args.config))?
    };
    parameters.validate()?;

    let seed = match &args.seed_vertex {
        Some(seed) => seed.clone(),
        None => graph.vertices().next().cloned().ok_or_else(|| {
            ContagionError::ContagionError(format!(
                "edge list {} has no vertices",
                args.edges.display()
            ))
        })?,
    };
    let mut simulation = Simulation::new(graph, &seed)?;
    if args.interactive {
        simulation = simulation.with_history(Some(CONSOLE_HISTORY_DAYS));
    }

    let mut session = Session::new(simulation, parameters, args.random_seed);
    session.set_runner(
        session
            .runner()
            .clone()
            .with_delay(args.delay)
            .with_max_days(args.max_days),
    );

    // Optionally write the daily report, starting with day 0
    if !args.output_dir.is_empty() {
        let path = PathBuf::from(&args.output_dir).join(DAILY_REPORT);
        let mut report = CsvReport::create(&path)?;
        report.record(
            &session.simulation().current_report(),
            session.simulation().state(),
        )?;
        session.add_sink(Box::new(report));
    }

    Ok(session)
}

fn run_with_args_internal<A, F>(
    args: BaseArgs,
    custom_args: Option<A>,
    setup_fn: F,
) -> Result<Session, Box<dyn std::error::Error>>
where
    F: Fn(&mut Session, BaseArgs, Option<A>) -> Result<(), ContagionError>,
{
    if args.verbose > 0 {
        set_log_level(verbosity_level(args.verbose));
    }
    if let Some(spec) = &args.log_level {
        apply_log_level(spec)?;
    }

    let mut session = build_session(&args)?;
    let interactive = args.interactive;

    // Run the provided Fn
    setup_fn(&mut session, args, custom_args)?;

    if interactive {
        start_console(&mut session)?;
    } else {
        session.run_auto()?;
    }
    Ok(session)
}

#[cfg(feature = "console")]
fn start_console(session: &mut Session) -> Result<(), ContagionError> {
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    crate::console::run(session, &mut stdin.lock(), &mut stdout.lock())
}

#[cfg(not(feature = "console"))]
fn start_console(_: &mut Session) -> Result<(), ContagionError> {
    Err(ContagionError::ContagionError(
        "the console is not available in this build".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;
    use crate::report::ReportLog;
    use crate::state::SimulationState;
    use clap::Parser;
    use std::cell::RefCell;
    use std::rc::Rc;
    use tempfile::tempdir;

    const SMALL_TOWN: &str = "tests/data/small_town.csv";

    #[derive(Args, Debug)]
    struct CustomArgs {
        #[arg(short, long, default_value = "0")]
        field: u32,
    }

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(flatten)]
        base: BaseArgs,
    }

    fn line_session(parameters: ParameterSet) -> Session {
        let graph = Graph::from_edges([("A", "B"), ("B", "C"), ("C", "D")]);
        Session::new(Simulation::new(graph, "A").unwrap(), parameters, 7)
    }

    #[test]
    fn parses_command_line() {
        let cli = TestCli::try_parse_from([
            "contagion",
            "--edges",
            "edges.csv",
            "--seed-vertex",
            "ana",
            "--random-seed",
            "9",
            "--delay",
            "250ms",
            "--max-days",
            "30",
            "-vv",
            "--interactive",
        ])
        .unwrap();
        let args = cli.base;
        assert_eq!(args.edges, PathBuf::from("edges.csv"));
        assert_eq!(args.seed_vertex.as_deref(), Some("ana"));
        assert_eq!(args.random_seed, 9);
        assert_eq!(args.delay, Duration::from_millis(250));
        assert_eq!(args.max_days, Some(30));
        assert_eq!(args.verbose, 2);
        assert!(args.interactive);
        assert!(args.config.is_empty());
    }

    #[test]
    fn edges_are_required() {
        assert!(TestCli::try_parse_from(["contagion"]).is_err());
    }

    #[test]
    fn bad_delay() {
        let result = TestCli::try_parse_from(["contagion", "-e", "x.csv", "--delay", "soon"]);
        assert!(result.is_err());
    }

    #[test]
    fn auto_run_until_over() {
        let mut session = line_session(ParameterSet::default());
        let mut log = ReportLog::new();
        let runner = session.runner().clone();
        let outcome = runner
            .run(&mut session.simulation, &mut session.rng, &mut log)
            .unwrap();

        assert_eq!(outcome.reason, StopReason::OutbreakOver);
        assert!(session.simulation().is_over());
        assert_eq!(log.reports().len(), outcome.days_run as usize);
        assert_eq!(log.reports().last().unwrap().total_cases, 0);
    }

    #[test]
    fn auto_run_day_limit() {
        let mut session = line_session(ParameterSet::default());
        let outcome = session.run_auto_for(Some(2)).unwrap();
        assert_eq!(
            outcome,
            RunOutcome {
                days_run: 2,
                reason: StopReason::DayLimit
            }
        );
        assert_eq!(session.simulation().state().day(), 2);
    }

    #[test]
    fn auto_run_stop_signal() {
        let mut session = line_session(ParameterSet::default());
        session.runner().stop_handle().store(true, Ordering::Relaxed);
        let outcome = session.run_auto().unwrap();
        assert_eq!(outcome, RunOutcome { days_run: 0, reason: StopReason::Stopped });
        assert_eq!(session.simulation().state().day(), 0);
    }

    #[test]
    fn stop_from_another_thread() {
        let mut session = line_session(ParameterSet {
            r0: 0.0,
            r0_delta: 0.0,
            infectious_period: 1000,
            ..ParameterSet::default()
        });
        session.set_runner(
            session
                .runner()
                .clone()
                .with_delay(Duration::from_millis(5)),
        );
        let stop = session.runner().stop_handle();
        let stopper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            stop.store(true, Ordering::Relaxed);
        });

        let outcome = session.run_auto().unwrap();
        stopper.join().unwrap();
        assert_eq!(outcome.reason, StopReason::Stopped);
        assert!(outcome.days_run > 0);
        assert!(!session.simulation().is_over());
    }

    #[test]
    fn parameter_changes_apply_next_step() {
        let mut session = line_session(ParameterSet {
            r0: 0.0,
            r0_delta: 0.0,
            ..ParameterSet::default()
        });
        let report = session.step().unwrap();
        assert_eq!(report.new_cases, 0);

        let handle = session.parameters().clone();
        handle.update(|parameters| parameters.r0 = 5.0);
        let report = session.step().unwrap();
        assert_eq!(report.new_cases, 1);
    }

    #[test]
    fn invalid_parameters_stop_the_run() {
        let mut session = line_session(ParameterSet::default());
        session
            .parameters()
            .update(|parameters| parameters.death_probability = 2.0);
        let result = session.run_auto();
        assert!(matches!(result, Err(ContagionError::InvalidParameter(_))));
        assert_eq!(session.simulation().state().day(), 0);
    }

    #[test]
    fn build_session_defaults() {
        let session = build_session(&BaseArgs::new(SMALL_TOWN)).unwrap();
        let state = session.simulation().state();
        // The first vertex of the edge list is the seed.
        assert!(state.status("ana").unwrap().is_infectious());
        assert_eq!(state.counts().active_cases(), 1);
        assert_eq!(session.parameters().snapshot(), ParameterSet::default());
    }

    #[test]
    fn build_session_with_seed_vertex_and_config() {
        let args = BaseArgs {
            seed_vertex: Some("kai".to_string()),
            config: "tests/data/parameters.json".to_string(),
            ..BaseArgs::new(SMALL_TOWN)
        };
        let session = build_session(&args).unwrap();
        assert!(session.simulation().state().status("kai").unwrap().is_infectious());
        let parameters = session.parameters().snapshot();
        assert_eq!(parameters.quarantine_delay, Some(2));
        assert_eq!(parameters.infectious_period, 4);
    }

    #[test]
    fn build_session_unknown_seed_vertex() {
        let args = BaseArgs {
            seed_vertex: Some("nobody".to_string()),
            ..BaseArgs::new(SMALL_TOWN)
        };
        let result = build_session(&args);
        assert!(matches!(result, Err(ContagionError::NotFound(vertex)) if vertex == "nobody"));
    }

    #[test]
    fn run_with_output_dir() {
        let temp_dir = tempdir().unwrap();
        let args = BaseArgs {
            output_dir: temp_dir.path().to_string_lossy().into_owned(),
            max_days: Some(5),
            ..BaseArgs::new(SMALL_TOWN)
        };
        let session = run_with_args_internal(args, None, |_, _, _: Option<()>| Ok(())).unwrap();

        let mut reader = csv::Reader::from_path(temp_dir.path().join(DAILY_REPORT)).unwrap();
        let rows: Vec<StepReport> = reader.deserialize().map(Result::unwrap).collect();
        let days_run = session.simulation().state().day() as usize;
        // Day 0 plus one row per step.
        assert_eq!(rows.len(), days_run + 1);
        assert_eq!(rows[0].day, 0);
        assert_eq!(rows[0].cumulative_cases, 1);
        assert!(days_run <= 5);
    }

    #[test]
    fn run_with_random_seed() {
        let args = BaseArgs {
            random_seed: 42,
            ..BaseArgs::new(SMALL_TOWN)
        };
        let first =
            run_with_args_internal(args.clone(), None, |_, _, _: Option<()>| Ok(())).unwrap();
        let second = run_with_args_internal(args, None, |_, _, _: Option<()>| Ok(())).unwrap();
        assert_eq!(
            first.simulation().current_report(),
            second.simulation().current_report()
        );
        assert_eq!(first.simulation().state(), second.simulation().state());
    }

    #[test]
    fn run_with_custom() {
        let custom = CustomArgs { field: 42 };
        let result = run_with_args_internal(
            BaseArgs {
                max_days: Some(0),
                ..BaseArgs::new(SMALL_TOWN)
            },
            Some(custom),
            |session, _, c| {
                assert_eq!(c.unwrap().field, 42);
                session.add_sink(Box::new(ReportLog::new()));
                Ok(())
            },
        );
        assert_eq!(result.unwrap().simulation().state().day(), 0);
    }

    #[test]
    fn setup_errors_propagate() {
        let result =
            run_with_args_internal(BaseArgs::new(SMALL_TOWN), None, |_, _, _: Option<()>| {
                Err(ContagionError::ContagionError("no".to_string()))
            });
        assert!(result.is_err());
    }

    #[test]
    fn only_interactive_sessions_keep_history() {
        let mut session = build_session(&BaseArgs::new(SMALL_TOWN)).unwrap();
        session.run_auto_for(Some(3)).unwrap();
        assert_eq!(session.simulation().history().len(), 0);

        let args = BaseArgs {
            interactive: true,
            ..BaseArgs::new(SMALL_TOWN)
        };
        let mut session = build_session(&args).unwrap();
        session.run_auto_for(Some(3)).unwrap();
        assert_eq!(
            session.simulation().history().len(),
            session.simulation().state().day() as usize
        );
    }

    #[derive(Clone, Default)]
    struct DayTrail(Rc<RefCell<Vec<Day>>>);

    impl StepSink for DayTrail {
        fn record(
            &mut self,
            report: &StepReport,
            _: &SimulationState,
        ) -> Result<(), ContagionError> {
            self.0.borrow_mut().push(report.day);
            Ok(())
        }

        fn rewind(&mut self, day: Day) -> Result<(), ContagionError> {
            self.0.borrow_mut().retain(|recorded| *recorded <= day);
            Ok(())
        }
    }

    #[test]
    fn rewind_reaches_the_sinks() {
        let graph = Graph::from_edges([("A", "B"), ("B", "C"), ("C", "D")]);
        let simulation = Simulation::new(graph, "A").unwrap().with_history(Some(8));
        let mut session = Session::new(simulation, ParameterSet::default(), 7);
        let trail = DayTrail::default();
        session.add_sink(Box::new(trail.clone()));

        session.step().unwrap();
        session.step().unwrap();
        assert!(session.rewind().unwrap());
        session.step().unwrap();
        assert_eq!(*trail.0.borrow(), vec![1, 2]);
    }

    #[test]
    fn bad_log_level() {
        assert!(apply_log_level("loud").is_err());
        assert!(apply_log_level("ixa_contagion=loud").is_err());
    }

    #[test]
    fn verbosity() {
        assert_eq!(verbosity_level(1), LevelFilter::Info);
        assert_eq!(verbosity_level(2), LevelFilter::Debug);
        assert_eq!(verbosity_level(9), LevelFilter::Trace);
    }
}
