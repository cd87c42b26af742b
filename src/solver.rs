use good_lp::Solution as _;
use good_lp::{
    Expression, ProblemVariables, ResolutionError, SolutionStatus, SolverModel, Variable,
    constraint, default_solver, variable,
};
use log::{debug, error, info, trace, warn};
use serde::{Deserialize, Serialize};
use std::ops::ControlFlow;
use std::time::{Duration, Instant};

use crate::data::{CourseCatalog, Plan, SessionType, SolveStatus, Solution, Weekday};
use crate::diagnosis::diagnose;
use crate::error::PlanError;
use crate::model::{OptionIdx, TimetableModel};
use crate::report::{clashing_pairs, describe_clash};

/// What HiGHS reports when it stops at a limit before finding any assignment.
const NO_SOLUTION_FOUND: &str = "NoSolutionFound";

/// Chosen options of one search step and whether they were proven optimal.
type StepResult = Result<(Vec<OptionIdx>, SolveStatus), ResolutionError>;

/// Knobs for one build-and-solve call.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SolverConfig {
    /// Wall-clock budget in seconds, shared by every search step of one call.
    pub time_limit: f64,
    /// How many ranked solutions to collect.
    pub max_solutions: usize,
    pub threads: i32,
    pub random_seed: i32,
    pub log_to_console: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            time_limit: 10.0,
            max_solutions: 3,
            threads: 1, // limit to 1 thread for reproducibility
            random_seed: 1234,
            log_to_console: false,
        }
    }
}

impl SolverConfig {
    /// The time limit as a duration; negative or non-finite limits leave no budget.
    pub fn budget(&self) -> Duration {
        Duration::try_from_secs_f64(self.time_limit).unwrap_or(Duration::ZERO)
    }
}

/// Searches for assignments in ascending campus-day order, handing each to `on_solution`.
///
/// After every solution a cut excluding exactly that assignment is added and
/// the search resumes, so no assignment is reported twice. The search ends
/// when `on_solution` breaks, when no further assignment exists, or when the
/// time budget runs out. A solution found at the time limit is marked
/// [`SolveStatus::BestEffort`] and ends the search.
///
/// Returns how many solutions were handed out.
pub fn solve_with<F>(
    model: &TimetableModel<'_>,
    config: &SolverConfig,
    on_solution: F,
) -> Result<usize, PlanError>
where
    F: FnMut(Solution) -> ControlFlow<()>,
{
    run_search(
        model,
        config,
        |cuts, remaining| search_step(model, config, cuts, remaining),
        on_solution,
    )
}

/// The enumeration loop around one search step per solution.
fn run_search<S, F>(
    model: &TimetableModel<'_>,
    config: &SolverConfig,
    mut step: S,
    mut on_solution: F,
) -> Result<usize, PlanError>
where
    S: FnMut(&[Vec<OptionIdx>], Duration) -> StepResult,
    F: FnMut(Solution) -> ControlFlow<()>,
{
    let deadline = Instant::now() + config.budget();
    let mut cuts: Vec<Vec<OptionIdx>> = Vec::new();
    let mut found = 0;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            info!("Time budget exhausted after {found} solutions.");
            break;
        }

        let step_start = Instant::now();
        match step(&cuts, remaining) {
            Ok((chosen, status)) => {
                let solution = model.resolve(&chosen, status);
                found += 1;
                debug!(
                    "Solution {found} found in {:.2?}: {} campus days ({status:?}).",
                    step_start.elapsed(),
                    solution.campus_day_count()
                );
                log_clashes(found, &solution);

                cuts.push(chosen);
                if on_solution(solution).is_break() {
                    break;
                }
                if status == SolveStatus::BestEffort {
                    info!("Stopping after solution {found}: optimality was not proven in time.");
                    break;
                }
            }
            Err(ResolutionError::Infeasible) => {
                debug!("No further assignment exists after {found} solutions.");
                break;
            }
            Err(ResolutionError::Other(NO_SOLUTION_FOUND)) => {
                warn!("Search step stopped at its limit without a solution.");
                break;
            }
            Err(e) if Instant::now() >= deadline => {
                warn!("Search step ended at the time limit without a solution: {e}");
                break;
            }
            Err(e) if found > 0 => {
                warn!("Stopping enumeration after {found} solutions: {e}");
                break;
            }
            Err(e) => return Err(PlanError::Solver(e.to_string())),
        }
    }

    Ok(found)
}

/// Logs every clash left in a solution and returns how many the model should have excluded.
///
/// Lecture-against-lecture clashes are fixed by the catalog and only warned
/// about. Any clash involving a chosen tutorial or lab is an error.
fn log_clashes(found: usize, solution: &Solution) -> usize {
    let mut model_errors = 0;
    for (a, b) in clashing_pairs(solution.sessions()) {
        let clash = describe_clash(a, b);
        if a.kind() == SessionType::Lecture && b.kind() == SessionType::Lecture {
            warn!("Solution {found} keeps a lecture clash: {clash}");
        } else {
            error!("Solution {found} contains a clash the model should exclude: {clash}");
            model_errors += 1;
        }
    }
    model_errors
}

/// Collects up to `n` solutions, ranked by ascending campus-day count.
///
/// Ties keep the order in which the search found them. Fewer than `n`
/// solutions are returned when fewer exist.
pub fn enumerate(
    model: &TimetableModel<'_>,
    config: &SolverConfig,
    n: usize,
) -> Result<Vec<Solution>, PlanError> {
    let n = n.max(1);
    let mut solutions = Vec::with_capacity(n);
    solve_with(model, config, |solution| {
        solutions.push(solution);
        if solutions.len() >= n {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    })?;
    solutions.sort_by_key(Solution::campus_day_count);
    Ok(solutions)
}

/// The optimal solution, or `None` if no assignment was found in time.
pub fn solve_best(
    model: &TimetableModel<'_>,
    config: &SolverConfig,
) -> Result<Option<Solution>, PlanError> {
    Ok(enumerate(model, config, 1)?.into_iter().next())
}

/// Builds the model for `selected`, solves it and explains any failure.
pub fn plan<S: AsRef<str>>(
    catalog: &CourseCatalog,
    selected: &[S],
    config: &SolverConfig,
) -> Result<Plan, PlanError> {
    let start_time = Instant::now();
    let model = TimetableModel::build(catalog, selected)?;

    info!("Starting ILP solver...");
    let solutions = enumerate(&model, config, config.max_solutions)?;
    match Plan::from_ranked(solutions) {
        Some(plan) => {
            info!(
                "{} solutions found in {:.2?}; best needs {} campus days.",
                plan.solutions().len(),
                start_time.elapsed(),
                plan.best().campus_day_count()
            );
            Ok(plan)
        }
        None => {
            let diagnosis = diagnose(catalog, selected);
            warn!("No feasible schedule: {diagnosis}");
            Err(PlanError::Infeasible { diagnosis })
        }
    }
}

/// Solves the model once with the given assignments cut off.
fn search_step(
    model: &TimetableModel<'_>,
    config: &SolverConfig,
    cuts: &[Vec<OptionIdx>],
    remaining: Duration,
) -> StepResult {
    let mut problem = ProblemVariables::new();

    // x_i = 1 if index option i is chosen
    let chosen: Vec<Variable> = problem.add_vector(variable().binary(), model.options().len());
    // d_k = 1 if weekday k is a campus day
    let campus: Vec<Variable> = problem.add_vector(variable().binary(), Weekday::ALL.len());

    let objective: Expression = campus.iter().copied().sum();
    let mut lp = problem
        .minimise(objective)
        .using(default_solver)
        .set_option("threads", config.threads)
        .set_option("random_seed", config.random_seed)
        .set_option("time_limit", remaining.as_secs_f64())
        .set_option("log_to_console", if config.log_to_console { "true" } else { "false" });

    for choice in model.courses() {
        let picked: Expression = choice.options.iter().map(|&i| chosen[i]).sum();
        lp.add_constraint(constraint!(picked == 1));
    }

    for &i in model.forbidden() {
        lp.add_constraint(constraint!(chosen[i] == 0));
    }

    for &(i, j) in model.exclusions() {
        lp.add_constraint(constraint!(chosen[i] + chosen[j] <= 1));
    }

    // campus day k == OR of the options meeting on k
    for day in Weekday::ALL {
        let day_var = campus[day.index()];
        let options = model.campus_day_options(day);
        for &i in options {
            lp.add_constraint(constraint!(day_var >= chosen[i]));
        }
        let any_option: Expression = options.iter().map(|&i| chosen[i]).sum();
        lp.add_constraint(constraint!(day_var <= any_option));
    }

    let max_overlap = model.courses().len() as i32 - 1;
    for cut in cuts {
        let repeated: Expression = cut.iter().map(|&i| chosen[i]).sum();
        lp.add_constraint(constraint!(repeated <= max_overlap));
    }
    trace!(
        "Search step with {} cuts and {:.2?} remaining.",
        cuts.len(),
        remaining
    );

    let solution = lp.solve()?;
    let picked = (0..chosen.len())
        .filter(|&i| solution.value(chosen[i]) > 0.5)
        .collect();
    Ok((picked, solve_status(solution.status())))
}

/// Only a proven optimum counts as optimal; time and gap limits yield best-effort solutions.
fn solve_status(status: SolutionStatus) -> SolveStatus {
    match status {
        SolutionStatus::Optimal => SolveStatus::Optimal,
        SolutionStatus::TimeLimit | SolutionStatus::GapLimit => SolveStatus::BestEffort,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Assignment, Minute, Session, WeekSet};

    fn tutorial(course: &str, day: Weekday, start: Minute, end: Minute) -> Session {
        Session::new(course, SessionType::Tutorial, day, start, end, WeekSet::ALL).unwrap()
    }

    /// Two courses, each with a Monday and a Wednesday option.
    fn two_by_two() -> CourseCatalog {
        let mut catalog = CourseCatalog::new();
        for course in ["MA1001", "MA1002"] {
            let offset = if course == "MA1001" { 0 } else { 120 };
            for (index, day) in [("mon", Weekday::Mon), ("wed", Weekday::Wed)] {
                catalog
                    .add_index_session(index, tutorial(course, day, 540 + offset, 600 + offset))
                    .unwrap();
            }
        }
        catalog
    }

    #[test]
    fn config_defaults_and_partial_overrides() {
        let config = SolverConfig::default();
        assert_eq!(config.budget(), Duration::from_secs(10));
        assert_eq!(config.max_solutions, 3);

        let config: SolverConfig = serde_json::from_str(r#"{"maxSolutions": 5}"#).unwrap();
        assert_eq!(config.max_solutions, 5);
        assert_eq!(config.random_seed, 1234);

        let config: SolverConfig = serde_json::from_str(r#"{"timeLimit": 2.5}"#).unwrap();
        assert_eq!(config.budget(), Duration::from_millis(2500));

        let config = SolverConfig {
            time_limit: -1.0,
            ..SolverConfig::default()
        };
        assert_eq!(config.budget(), Duration::ZERO);
    }

    #[test]
    fn best_solution_packs_courses_into_one_day() {
        let catalog = two_by_two();
        let model = TimetableModel::build(&catalog, &["MA1001", "MA1002"]).unwrap();
        let best = solve_best(&model, &SolverConfig::default()).unwrap().unwrap();

        assert_eq!(best.campus_day_count(), 1);
        assert_eq!(best.status(), SolveStatus::Optimal);
        assert_eq!(best.assignment()["MA1001"], best.assignment()["MA1002"]);
    }

    #[test]
    fn enumeration_is_ranked_and_never_repeats() {
        let catalog = two_by_two();
        let model = TimetableModel::build(&catalog, &["MA1001", "MA1002"]).unwrap();
        let solutions = enumerate(&model, &SolverConfig::default(), 10).unwrap();

        assert_eq!(solutions.len(), 4);
        let counts: Vec<usize> = solutions.iter().map(Solution::campus_day_count).collect();
        assert_eq!(counts, vec![1, 1, 2, 2]);
        for (i, a) in solutions.iter().enumerate() {
            for b in &solutions[i + 1..] {
                assert_ne!(a.assignment(), b.assignment());
            }
        }
    }

    #[test]
    fn callback_can_stop_the_search_early() {
        let catalog = two_by_two();
        let model = TimetableModel::build(&catalog, &["MA1001", "MA1002"]).unwrap();
        let mut seen = 0;
        let found = solve_with(&model, &SolverConfig::default(), |_| {
            seen += 1;
            ControlFlow::Break(())
        })
        .unwrap();
        assert_eq!(found, 1);
        assert_eq!(seen, 1);
    }

    #[test]
    fn zero_budget_finds_nothing() {
        let catalog = two_by_two();
        let model = TimetableModel::build(&catalog, &["MA1001"]).unwrap();
        let config = SolverConfig {
            time_limit: 0.0,
            ..SolverConfig::default()
        };
        assert_eq!(enumerate(&model, &config, 3).unwrap(), vec![]);
    }

    #[test]
    fn plan_reports_diagnosis_when_infeasible() {
        let mut catalog = CourseCatalog::new();
        catalog
            .add_index_session("1", tutorial("MA1001", Weekday::Fri, 540, 600))
            .unwrap();
        catalog
            .add_index_session("2", tutorial("MA1002", Weekday::Fri, 570, 630))
            .unwrap();

        let err = plan(&catalog, &["MA1001", "MA1002"], &SolverConfig::default()).unwrap_err();
        assert_eq!(
            err,
            PlanError::Infeasible {
                diagnosis: "Conflict: MA1001 Index 1 clashes with MA1002 Index 2".to_string()
            }
        );
    }

    #[test]
    fn only_a_proven_optimum_is_optimal() {
        assert_eq!(solve_status(SolutionStatus::Optimal), SolveStatus::Optimal);
        assert_eq!(solve_status(SolutionStatus::TimeLimit), SolveStatus::BestEffort);
        assert_eq!(solve_status(SolutionStatus::GapLimit), SolveStatus::BestEffort);
    }

    #[test]
    fn best_effort_solution_is_delivered_and_ends_the_search() {
        let catalog = two_by_two();
        let model = TimetableModel::build(&catalog, &["MA1001"]).unwrap();
        let mut steps = 0;
        let mut seen = Vec::new();
        let found = run_search(
            &model,
            &SolverConfig::default(),
            |cuts, _| {
                steps += 1;
                assert!(cuts.is_empty());
                Ok((vec![1], SolveStatus::BestEffort))
            },
            |solution| {
                seen.push(solution);
                ControlFlow::Continue(())
            },
        )
        .unwrap();

        assert_eq!(found, 1);
        assert_eq!(steps, 1);
        assert_eq!(seen[0].status(), SolveStatus::BestEffort);
        assert_eq!(seen[0].assignment()["MA1001"], "wed");
    }

    #[test]
    fn limit_without_a_solution_is_not_an_error() {
        let catalog = two_by_two();
        let model = TimetableModel::build(&catalog, &["MA1001"]).unwrap();
        let found = run_search(
            &model,
            &SolverConfig::default(),
            |_, _| Err(ResolutionError::Other(NO_SOLUTION_FOUND)),
            |_| ControlFlow::Continue(()),
        )
        .unwrap();
        assert_eq!(found, 0);

        let err = run_search(
            &model,
            &SolverConfig::default(),
            |_, _| Err(ResolutionError::Other("ModelError")),
            |_| ControlFlow::Continue(()),
        )
        .unwrap_err();
        assert!(matches!(err, PlanError::Solver(_)));
    }

    #[test]
    fn clashes_with_chosen_sessions_count_as_model_errors() {
        let lecture = |course: &str| {
            Session::new(course, SessionType::Lecture, Weekday::Mon, 540, 600, WeekSet::ALL)
                .unwrap()
        };
        let lectures_only = Solution::new(
            Assignment::new(),
            vec![lecture("MA1001"), lecture("MA1002")],
            SolveStatus::Optimal,
        );
        assert_eq!(log_clashes(1, &lectures_only), 0);

        let with_tutorial = Solution::new(
            Assignment::new(),
            vec![lecture("MA1001"), tutorial("MA1002", Weekday::Mon, 570, 630)],
            SolveStatus::Optimal,
        );
        assert_eq!(log_clashes(1, &with_tutorial), 1);
    }
}
