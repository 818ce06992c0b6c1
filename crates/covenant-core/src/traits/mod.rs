mod dashboard_source;
mod storage;

pub use dashboard_source::IDashboardSource;
pub use storage::{
    BucketWrite, CompletionOutcome, DependencyInsert, EscalationState, IAlertStorage,
    IAnomalyStorage, IContractStorage, IDependencyStorage, IEnterpriseDirectory,
    IEscalationStorage, IMetricStorage, IObligationStorage, IPatternStorage, IRenewalStorage,
};
