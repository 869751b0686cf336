//! Benchmark definition: the cubes a benchmark binds together.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A benchmark binds a data preparation cube, a reference model, an evaluator
/// and the set of models associated with it.
///
/// `models` always contains `reference_model_mlcube`; use [`Benchmark::new`] or
/// [`Benchmark::with_models`] to keep that invariant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Benchmark {
    pub uid: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub data_preparation_mlcube: String,
    pub reference_model_mlcube: String,
    pub data_evaluator_mlcube: String,
    #[serde(default)]
    pub models: BTreeSet<String>,
    /// Generated uid of the dataset obtained by preparing the demo data.
    #[serde(default)]
    pub demo_dataset_uid: Option<String>,
}

impl Benchmark {
    pub fn new(
        uid: u64,
        name: impl Into<String>,
        data_preparation_mlcube: impl Into<String>,
        reference_model_mlcube: impl Into<String>,
        data_evaluator_mlcube: impl Into<String>,
    ) -> Self {
        let reference_model_mlcube = reference_model_mlcube.into();
        let mut models = BTreeSet::new();
        models.insert(reference_model_mlcube.clone());
        Self {
            uid,
            name: name.into(),
            description: String::new(),
            data_preparation_mlcube: data_preparation_mlcube.into(),
            reference_model_mlcube,
            data_evaluator_mlcube: data_evaluator_mlcube.into(),
            models,
            demo_dataset_uid: None,
        }
    }

    /// Merge associated models into the set. The reference model stays a member.
    pub fn with_models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.models.extend(models.into_iter().map(Into::into));
        self.models.insert(self.reference_model_mlcube.clone());
        self
    }

    pub fn with_demo_dataset(mut self, uid: impl Into<String>) -> Self {
        self.demo_dataset_uid = Some(uid.into());
        self
    }

    pub fn contains_model(&self, model_uid: &str) -> bool {
        self.models.contains(model_uid)
    }
}
