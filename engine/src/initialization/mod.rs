mod param_gen;
mod random;

pub use param_gen::ParamGen;
pub use random::RandParamGen;

use messages::{args::InitMethod, data::Token};

use crate::{
    error::{EngineErr, Result},
    storage::TopicModel,
};

/// Builds a normalized model over `tokens`.
///
/// # Arguments
/// * `name` - The name of the model.
/// * `topic_names` - The topics of the model.
/// * `tokens` - The vocabulary of the model.
/// * `method` - Whether the topics start uniform or from seeded random weights.
/// * `seed` - The seed of the random weights.
///
/// # Returns
/// The model or an `InvalidConfig` error if the topics or tokens are invalid.
pub fn initial_model(
    name: &str,
    topic_names: Vec<String>,
    tokens: Vec<Token>,
    method: InitMethod,
    seed: u64,
) -> Result<TopicModel> {
    if tokens.is_empty() {
        return Err(EngineErr::invalid(format!("model {name} would have no tokens")));
    }

    let mut model = TopicModel::zeros(name, topic_names, tokens)?;
    let len = model.values().len();

    match method {
        InitMethod::Random => {
            let mut param_gen = RandParamGen::seeded_uniform(seed, len, 0., 1.)?;
            fill(&mut model, &mut param_gen)?;
        }
        InitMethod::Uniform => model.values_mut().fill(1.),
    }

    model.normalize();
    Ok(model)
}

/// Fills every weight of `model` with samples of `param_gen`, token by token.
///
/// # Returns
/// An `InvalidConfig` error if the generator runs out of samples.
pub fn fill(model: &mut TopicModel, param_gen: &mut dyn ParamGen) -> Result<()> {
    for w in 0..model.num_tokens() {
        if !param_gen.fill_row(model.row_mut(w)) {
            return Err(EngineErr::invalid(format!(
                "not enough initial weights for model {}",
                model.name()
            )));
        }
    }

    Ok(())
}
