mod bookkeeping;
pub mod colonization;
pub mod culture_spawn;
mod demography;

pub use bookkeeping::{reconcile, BookkeepingSystem};
pub use colonization::{attempt_expansion, ColonizationSystem, ExpansionOutcome};
pub use culture_spawn::{check_culture_spawn, CultureSpawnSystem, SpawnReport};
pub use demography::{grow_unaffiliated, DemographySystem};
