use std::sync::Arc;

use log::info;
use messages::{
    args::{
        FitOfflineMasterModelArgs, FitOnlineMasterModelArgs, MergeModelArgs, NormalizeModelArgs,
        ProcessBatchesArgs, RegularizeModelArgs, TransformMasterModelArgs,
    },
    data::ThetaMatrix,
};

use super::MasterComponent;
use crate::{
    error::{EngineErr, Result},
    processing::assemble_theta,
    storage::validate_batch,
    training::{ProcessOptions, online_schedule},
};

fn document_passes(requested: Option<u32>, default: u32) -> Result<u32> {
    match requested {
        Some(0) => Err(EngineErr::invalid("num_document_passes must be positive")),
        Some(passes) => Ok(passes),
        None => Ok(default),
    }
}

impl MasterComponent {
    /// Checks the arguments of `process_batches` and that the batches and the
    /// source model exist, without touching any state.
    pub fn validate_process(&self, args: &ProcessBatchesArgs) -> Result<()> {
        if !args.batch_weights.is_empty() && args.batch_weights.len() != args.batch_names.len() {
            return Err(EngineErr::invalid(format!(
                "{} batch weights were given for {} batches",
                args.batch_weights.len(),
                args.batch_names.len()
            )));
        }

        if args.batch_weights.iter().any(|w| !w.is_finite()) {
            return Err(EngineErr::invalid("batch weights must be finite"));
        }

        document_passes(args.num_document_passes, 1)?;
        self.batches.check(&args.batch_names)?;
        self.require_model(args.pwt_source_name.as_deref())?;
        Ok(())
    }

    /// Infers the documents of the given batches against a model, optionally
    /// storing their reduced counters as a new model.
    ///
    /// # Returns
    /// The inferred distributions, empty unless `return_theta` is set.
    pub fn process_batches(&self, args: &ProcessBatchesArgs) -> Result<ThetaMatrix> {
        self.validate_process(args)?;
        let _guard = self.lock();

        let trainer = self.trainer();
        let config = &trainer.settings().config;
        let batches = self.batches.resolve(&args.batch_names, None)?;

        let options = ProcessOptions {
            pwt_name: args
                .pwt_source_name
                .clone()
                .unwrap_or_else(|| config.pwt_name.clone()),
            num_document_passes: document_passes(
                args.num_document_passes,
                config.num_document_passes,
            )?,
            batch_weights: args.batch_weights.clone(),
            collect_nwt: args.nwt_target_name.is_some(),
            collect_scores: true,
            use_cache: true,
        };
        let processed = trainer.process(&batches, &options)?;

        if let Some(target) = &args.nwt_target_name {
            let mut nwt =
                trainer.reduce(&processed.pwt, &processed.outcomes, &options.batch_weights)?;
            nwt.set_name(target.as_str());
            self.models.publish(nwt);
        }

        if !args.return_theta {
            return Ok(ThetaMatrix {
                model_name: processed.pwt.name().to_string(),
                version: processed.pwt.version(),
                ..Default::default()
            });
        }

        let blocks: Vec<_> = processed
            .outcomes
            .iter()
            .map(|o| (processed.pwt.version(), Arc::clone(&o.theta)))
            .collect();
        assemble_theta(processed.pwt.name(), &blocks, &[])
    }

    pub fn validate_fit_offline(&self, args: &FitOfflineMasterModelArgs) -> Result<()> {
        if args.num_collection_passes == 0 {
            return Err(EngineErr::invalid("num_collection_passes must be positive"));
        }

        Ok(())
    }

    /// Trains the model over full passes of the collection.
    ///
    /// # Returns
    /// The last published version.
    pub fn fit_offline(&self, args: &FitOfflineMasterModelArgs) -> Result<u64> {
        self.validate_fit_offline(args)?;
        let _guard = self.lock();

        let batches = self
            .batches
            .resolve(&args.batch_names, args.batch_folder.as_deref())?;
        self.trainer().fit_offline(&batches, args.num_collection_passes)
    }

    /// Checks that the batches of an online fit exist and that its update
    /// schedule covers them.
    pub fn validate_fit_online(&self, args: &FitOnlineMasterModelArgs) -> Result<()> {
        self.batches.check(&args.batch_names)?;

        let num_batches = if args.batch_names.is_empty() {
            self.batches.all().len()
        } else {
            args.batch_names.len()
        };

        online_schedule(args, num_batches).map(|_| ())
    }

    /// Trains the model incrementally, one version per update group.
    ///
    /// # Returns
    /// The last published version.
    pub fn fit_online(&self, args: &FitOnlineMasterModelArgs) -> Result<u64> {
        let _guard = self.lock();

        let batches = self.batches.resolve(&args.batch_names, None)?;
        let groups = online_schedule(args, batches.len())?;
        self.trainer().fit_online(&batches, &groups)
    }

    pub fn merge_model(&self, args: &MergeModelArgs) -> Result<u64> {
        let _guard = self.lock();
        Ok(self.trainer().merge_model(args)?.version())
    }

    pub fn regularize_model(&self, args: &RegularizeModelArgs) -> Result<u64> {
        let _guard = self.lock();
        Ok(self.trainer().regularize_model(args)?.version())
    }

    pub fn normalize_model(&self, args: &NormalizeModelArgs) -> Result<u64> {
        let _guard = self.lock();
        Ok(self.trainer().normalize_model(args)?.version())
    }

    /// Infers the documents of named and inline batches without updating the
    /// model or any cache.
    pub fn transform(&self, args: &TransformMasterModelArgs) -> Result<ThetaMatrix> {
        if args.batch_names.is_empty() && args.batches.is_empty() {
            return Err(EngineErr::invalid("there are no batches to transform"));
        }

        let trainer = self.trainer();
        let config = &trainer.settings().config;

        let mut batches = if args.batch_names.is_empty() {
            Vec::new()
        } else {
            self.batches.resolve(&args.batch_names, None)?
        };
        for batch in &args.batches {
            validate_batch(batch)?;
            batches.push(Arc::new(batch.clone()));
        }

        let options = ProcessOptions {
            pwt_name: config.pwt_name.clone(),
            num_document_passes: document_passes(
                args.num_document_passes,
                config.num_document_passes,
            )?,
            batch_weights: Vec::new(),
            collect_nwt: false,
            collect_scores: false,
            use_cache: false,
        };
        let processed = trainer.process(&batches, &options)?;

        info!(
            master_id = self.id(), version = processed.pwt.version();
            "transformed {} batches", batches.len()
        );

        let blocks: Vec<_> = processed
            .outcomes
            .iter()
            .map(|o| (processed.pwt.version(), Arc::clone(&o.theta)))
            .collect();
        assemble_theta(processed.pwt.name(), &blocks, &[])
    }
}
