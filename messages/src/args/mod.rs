//! Arguments of the engine's operations.

mod control;
mod dictionary;
mod model;
mod processing;
mod retrieval;

pub use control::{AwaitOperationArgs, ConfigureLoggingArgs};
pub use dictionary::{
    ExportDictionaryArgs, FilterDictionaryArgs, GatherDictionaryArgs, GetDictionaryArgs,
    ImportDictionaryArgs,
};
pub use model::{
    AttachModelArgs, ExportModelArgs, GetTopicModelArgs, ImportModelArgs, InitMethod,
    InitializeModelArgs, MergeModelArgs, NormalizeModelArgs, RegularizeModelArgs, WeightedModel,
};
pub use processing::{
    CollectionParserConfig, FitOfflineMasterModelArgs, FitOnlineMasterModelArgs,
    ImportBatchesArgs, ProcessBatchesArgs, TransformMasterModelArgs,
};
pub use retrieval::{
    ClearScoreArrayCacheArgs, ClearScoreCacheArgs, ClearThetaCacheArgs, GetMasterComponentInfoArgs,
    GetScoreArrayArgs, GetScoreValueArgs, GetThetaMatrixArgs, VersionRange,
};
