mod decorrelator_phi;
mod regularizer;
mod registry;
mod smooth_sparse_phi;
mod smooth_sparse_theta;

pub use decorrelator_phi::DecorrelatorPhi;
pub use regularizer::{PhiContext, Regularizer, ThetaHook};
pub use registry::RegularizerSet;
pub use smooth_sparse_phi::SmoothSparsePhi;
pub use smooth_sparse_theta::SmoothSparseTheta;
