//! Compatibility gate evaluated before any cube is fetched.

use medbench_core::{Benchmark, CompatibilityError, Dataset, MedbenchError};

/// Outcome of evaluating the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompatVerdict {
    /// Violations found (empty when passed).
    pub violations: Vec<CompatibilityError>,
}

impl CompatVerdict {
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    /// `Ok` when passed, otherwise the first violation.
    pub fn into_result(self) -> Result<(), MedbenchError> {
        match self.violations.into_iter().next() {
            None => Ok(()),
            Some(violation) => Err(violation.into()),
        }
    }
}

/// Rules a benchmark/dataset/model triple must satisfy to be executed.
pub struct CompatibilityGate;

impl CompatibilityGate {
    /// Evaluate the gate.
    ///
    /// Gate rules:
    /// - The dataset must have been prepared with the benchmark's data
    ///   preparation cube
    /// - Unless `run_test` is set, the model must be associated with the
    ///   benchmark (the reference model always is)
    pub fn evaluate(
        benchmark: &Benchmark,
        dataset: &Dataset,
        model_uid: &str,
        run_test: bool,
    ) -> CompatVerdict {
        let mut violations = Vec::new();

        if dataset.preparation_cube_uid != benchmark.data_preparation_mlcube {
            violations.push(CompatibilityError::PreparationCubeMismatch {
                dataset_uid: dataset.uid.clone(),
                expected: benchmark.data_preparation_mlcube.clone(),
                actual: dataset.preparation_cube_uid.clone(),
            });
        }

        let is_member = benchmark.contains_model(model_uid)
            || benchmark.reference_model_mlcube == model_uid;
        if !run_test && !is_member {
            violations.push(CompatibilityError::ModelNotInBenchmark {
                model_uid: model_uid.to_string(),
                benchmark_uid: benchmark.uid,
            });
        }

        CompatVerdict { violations }
    }
}
