pub mod adducts;
pub mod challenge;
pub mod corpus;
pub mod fragmenter;
pub mod group;
pub mod metrics;
pub mod pool;
pub mod scoring;
pub mod serialization;
pub mod structure;

mod traits;

pub use adducts::{AdductView, ReactionDatabase, ReactionDatabaseError, resolve_adducts};
pub use challenge::{ChallengeInput, run_challenge, run_named_challenge};
pub use corpus::{ChallengeGroups, CorpusError, discover_challenges, partition_by_mode};
pub use fragmenter::CommandFragmenter;
pub use group::{BenchmarkReport, GroupReport, process_group, run_benchmark};
pub use metrics::{Summary, render_human_summary, summarize};
pub use pool::{PoolControl, PoolEvent, PoolStats, WorkerPool};
pub use scoring::{CandidateScore, MassComparator, score_candidate};
pub use structure::SmilesScreen;
pub use traits::{Fragmenter, SpectrumComparator, Structure, StructureParser, Toolkit};

impl Toolkit {
    /// SMILES screen, external fragmentation program and the mass comparator.
    pub fn with_command_fragmenter(fragmenter: CommandFragmenter) -> Self {
        Self::new(SmilesScreen, fragmenter, MassComparator::default())
    }
}
