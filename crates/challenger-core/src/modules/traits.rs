use crate::domain::{ChallengerResult, IonMode, SimilarityScore, Spectrum};

/// A candidate structure accepted by a [`StructureParser`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Structure {
    pub smiles: String,
}

pub trait StructureParser: Send + Sync {
    fn parse(&self, smiles: &str) -> ChallengerResult<Structure>;
}

pub trait Fragmenter: Send + Sync {
    /// Predicted fragment m/z values for `structure` under the reaction rules
    /// in `database` (already restricted to one adduct label).
    fn fragment(
        &self,
        structure: &Structure,
        database: &str,
        mode: IonMode,
    ) -> ChallengerResult<Vec<f64>>;
}

pub trait SpectrumComparator: Send + Sync {
    /// `masses` are sorted ascending.
    fn compare(&self, spectrum: &Spectrum, masses: &[f64]) -> SimilarityScore;
}

/// The chemistry collaborators a challenge run needs.
pub struct Toolkit {
    pub parser: Box<dyn StructureParser>,
    pub fragmenter: Box<dyn Fragmenter>,
    pub comparator: Box<dyn SpectrumComparator>,
}

impl Toolkit {
    pub fn new(
        parser: impl StructureParser + 'static,
        fragmenter: impl Fragmenter + 'static,
        comparator: impl SpectrumComparator + 'static,
    ) -> Self {
        Self {
            parser: Box::new(parser),
            fragmenter: Box::new(fragmenter),
            comparator: Box::new(comparator),
        }
    }
}
