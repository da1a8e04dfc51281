//! The ZERO++ ensemble: T subspace models built from independent subsamples,
//! scored together and averaged over R outer runs.

use std::sync::Arc;
use std::time::Instant;

use ndarray::{ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use rayon::ThreadPool;
use tracing::{debug, error, info, warn};

use crate::config::ZeroConfig;
use crate::dataset::Dataset;
use crate::error::{Result, ZeroError};
use crate::models::base_model::BaseModel;
use crate::models::scorer::SupportScorer;
use crate::models::subspace::{AttributeOrder, SubspaceModel, SubspaceModelBuilder};
use crate::utils::evaluation::{auc, RunReport, RunSummary, INVALID_AUC};
use crate::utils::sampling::SubsampleDrawer;

/// A fully built set of ensemble members.
#[derive(Debug, Clone)]
pub struct Ensemble {
    members: Vec<SubspaceModel>,
}

impl Ensemble {
    pub fn new(members: Vec<SubspaceModel>) -> Result<Self> {
        if members.is_empty() {
            return Err(ZeroError::ModelBuild("ensemble has no members".to_string()));
        }
        Ok(Self { members })
    }

    pub fn members(&self) -> &[SubspaceModel] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl BaseModel for Ensemble {
    /// Mean of the member scores, summed in member order.
    fn score_record(&self, index: usize, record: ArrayView1<'_, f64>) -> Result<f64> {
        let mut total = 0.0;
        for member in &self.members {
            total += SupportScorer::score(member, index, record)?;
        }
        Ok(total / self.members.len() as f64)
    }
}

/// A record that could not be scored.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringFailure {
    pub record: usize,
    pub reason: String,
}

/// Score of every record, `None` where scoring failed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreTable {
    scores: Vec<Option<f64>>,
    failures: Vec<ScoringFailure>,
}

impl ScoreTable {
    pub fn from_results(results: Vec<Result<f64>>) -> Self {
        let mut table = ScoreTable::default();
        for (record, result) in results.into_iter().enumerate() {
            match result {
                Ok(score) => table.scores.push(Some(score)),
                Err(err) => {
                    let reason = match err {
                        ZeroError::Scoring { reason, .. } => reason,
                        other => other.to_string(),
                    };
                    table.scores.push(None);
                    table.failures.push(ScoringFailure { record, reason });
                }
            }
        }
        table
    }

    /// Per-record mean over `tables`, added in table order. A record failed
    /// in any table is failed in the result.
    pub fn average(tables: &[ScoreTable]) -> ScoreTable {
        let Some(first) = tables.first() else {
            return ScoreTable::default();
        };
        let mut averaged = ScoreTable::default();
        for record in 0..first.len() {
            let mut total = 0.0;
            let mut failure = None;
            for table in tables {
                match table.get(record) {
                    Some(score) => total += score,
                    None => {
                        let found = table.failure(record).cloned();
                        failure = Some(found.unwrap_or_else(|| ScoringFailure {
                            record,
                            reason: "missing from run".to_string(),
                        }));
                        break;
                    }
                }
            }
            match failure {
                Some(f) => {
                    averaged.scores.push(None);
                    averaged.failures.push(f);
                }
                None => averaged.scores.push(Some(total / tables.len() as f64)),
            }
        }
        averaged
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn get(&self, record: usize) -> Option<f64> {
        self.scores.get(record).copied().flatten()
    }

    pub fn scores(&self) -> &[Option<f64>] {
        &self.scores
    }

    pub fn failures(&self) -> &[ScoringFailure] {
        &self.failures
    }

    /// Failures are kept in record order.
    pub fn failure(&self, record: usize) -> Option<&ScoringFailure> {
        self.failures
            .binary_search_by_key(&record, |f| f.record)
            .ok()
            .map(|i| &self.failures[i])
    }

    /// Scores with `NaN` in place of failed records.
    pub fn to_vec(&self) -> Vec<f64> {
        self.scores.iter().map(|s| s.unwrap_or(f64::NAN)).collect()
    }

    /// Labels and scores of the scored records, for evaluation.
    fn scored_pairs(&self, labels: &[f64]) -> (Vec<f64>, Vec<f64>) {
        self.scores
            .iter()
            .zip(labels)
            .filter_map(|(s, &l)| s.map(|s| (l, s)))
            .unzip()
    }
}

/// Averaged scores of an evaluated dataset with per-run details.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub scores: ScoreTable,
    pub runs: Vec<RunReport>,
    pub summary: RunSummary,
}

/// Builds and scores ensembles under one configuration.
#[derive(Debug, Clone)]
pub struct EnsembleCoordinator {
    config: ZeroConfig,
    /// Worker pool shared by every build and scoring pass; `None` runs on
    /// the calling thread.
    pool: Option<Arc<ThreadPool>>,
}

impl EnsembleCoordinator {
    pub fn new(config: ZeroConfig) -> Result<Self> {
        config.validate()?;
        let pool = config.parallel_settings().build_pool()?.map(Arc::new);
        Ok(Self { config, pool })
    }

    /// Worker threads used by build and scoring passes.
    pub fn num_threads(&self) -> usize {
        self.pool.as_ref().map_or(1, |pool| pool.current_num_threads())
    }

    /// `op` applied to `0..n`, results in index order.
    fn map_indexed<T, F>(&self, n: usize, op: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Send + Sync,
    {
        match &self.pool {
            Some(pool) => pool.install(|| (0..n).into_par_iter().map(&op).collect()),
            None => (0..n).map(op).collect(),
        }
    }

    pub fn config(&self) -> &ZeroConfig {
        &self.config
    }

    /// Seeds of the R outer runs, drawn from the configured base seed.
    pub fn run_seeds(&self) -> Vec<u64> {
        let mut rng = StdRng::seed_from_u64(self.config.base_seed);
        (0..self.config.num_runs).map(|_| rng.gen::<u64>()).collect()
    }

    /// Builds all T members for one run; member `i` is anchored at
    /// `run_seed + i`. Any member failure aborts the whole ensemble.
    pub fn build_ensemble(&self, dataset: &Dataset, run_seed: u64) -> Result<Ensemble> {
        let builder = SubspaceModelBuilder::new(
            dataset.attributes(),
            self.config.subspace_dimension,
            self.config.window_mode,
        )?;
        let drawer = SubsampleDrawer::new(dataset, self.config.subsample_size)?;
        let num_attributes = dataset.num_attributes();

        let built = self.map_indexed(self.config.num_trees, |member| -> Result<SubspaceModel> {
            let (subsample, mut rng) = drawer.draw(run_seed.wrapping_add(member as u64));
            let order = AttributeOrder::shuffled(num_attributes, &mut rng);
            let model = builder
                .build(dataset, &subsample, order)
                .map_err(|e| ZeroError::EnsembleBuild {
                    member,
                    source: Box::new(e),
                })?;
            debug!(
                "Built member {} (seed {}, {} windows)",
                member,
                subsample.seed,
                model.num_windows()
            );
            Ok(model)
        });

        // first failure in member order
        let members: Result<Vec<SubspaceModel>> = built.into_iter().collect();
        match members {
            Ok(members) => Ensemble::new(members),
            Err(e) => {
                error!("Ensemble build aborted: {}", e);
                Err(e)
            }
        }
    }

    /// Scores every row of `records` against `ensemble`; failed records are
    /// flagged in the table, never abort the pass.
    pub fn score_records(&self, ensemble: &Ensemble, records: ArrayView2<'_, f64>) -> ScoreTable {
        let results = self.map_indexed(records.nrows(), |i| {
            ensemble.score_record(i, records.row(i))
        });
        let table = ScoreTable::from_results(results);
        for failure in table.failures() {
            warn!("Record {} not scored: {}", failure.record, failure.reason);
        }
        table
    }

    pub fn score_dataset(&self, ensemble: &Ensemble, dataset: &Dataset) -> ScoreTable {
        self.score_records(ensemble, dataset.values())
    }

    /// One build-and-score cycle.
    pub fn run_once(&self, dataset: &Dataset, run_seed: u64) -> Result<ScoreTable> {
        let ensemble = self.build_ensemble(dataset, run_seed)?;
        Ok(self.score_dataset(&ensemble, dataset))
    }

    /// Scores of `dataset` against ensembles built from it, averaged over R runs.
    pub fn fit_score(&self, dataset: &Dataset) -> Result<ScoreTable> {
        let mut tables = Vec::with_capacity(self.config.num_runs);
        for (run, seed) in self.run_seeds().into_iter().enumerate() {
            let table = self.run_once(dataset, seed)?;
            debug!("Run {} scored {} records", run, table.len());
            tables.push(table);
        }
        Ok(ScoreTable::average(&tables))
    }

    /// Like [`fit_score`](Self::fit_score), also measuring each run against
    /// the dataset labels. A run that fails or cannot be measured reports
    /// [`INVALID_AUC`], which the summary averages in like any other run.
    pub fn evaluate(&self, dataset: &Dataset) -> Result<Evaluation> {
        let mut tables = Vec::with_capacity(self.config.num_runs);
        let mut runs = Vec::with_capacity(self.config.num_runs);
        let mut first_error = None;

        for (run, seed) in self.run_seeds().into_iter().enumerate() {
            let started = Instant::now();
            let ensemble = match self.build_ensemble(dataset, seed) {
                Ok(ensemble) => ensemble,
                Err(e) => {
                    runs.push(RunReport {
                        run,
                        seed,
                        auc: INVALID_AUC,
                        build_time: started.elapsed(),
                        score_time: Default::default(),
                    });
                    first_error.get_or_insert(e);
                    continue;
                }
            };
            let build_time = started.elapsed();

            let started = Instant::now();
            let table = self.score_dataset(&ensemble, dataset);
            let score_time = started.elapsed();

            let (labels, scores) = table.scored_pairs(dataset.labels());
            let run_auc = auc(&labels, &scores).unwrap_or(INVALID_AUC);
            info!(
                "Run {}: AUC {:.4}, build {:?}, score {:?}",
                run, run_auc, build_time, score_time
            );
            runs.push(RunReport {
                run,
                seed,
                auc: run_auc,
                build_time,
                score_time,
            });
            tables.push(table);
        }

        if tables.is_empty() {
            if let Some(e) = first_error {
                return Err(e);
            }
        }

        let summary = RunSummary::from_reports(&runs);
        info!(
            "Mean AUC {:.4} +/- {:.4} over {} runs",
            summary.mean_auc, summary.interval, summary.runs
        );

        Ok(Evaluation {
            scores: ScoreTable::average(&tables),
            runs,
            summary,
        })
    }
}
