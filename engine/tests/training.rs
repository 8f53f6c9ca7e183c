mod common;

use common::{assert_sums_to_one, create_master, encode, fetch, import, sample_batch};
use engine::{Client, ErrorKind, MasterHandle};
use messages::{
    args::{
        ClearThetaCacheArgs, FitOfflineMasterModelArgs, FitOnlineMasterModelArgs,
        GetScoreArrayArgs, GetScoreValueArgs, GetThetaMatrixArgs, GetTopicModelArgs,
        ProcessBatchesArgs,
    },
    data::{ScoreArray, ScoreData, ScoreValue, ThetaMatrix, TopicModelData},
    specs::{MasterModelConfig, RegularizerConfig, RegularizerKind, ScoreConfig, ScoreKind},
};

fn topic_model(client: &mut Client, handle: MasterHandle, name: &str) -> TopicModelData {
    let args = encode(
        client,
        &GetTopicModelArgs {
            model_name: Some(name.into()),
            ..Default::default()
        },
    );
    let len = client.request_topic_model(handle, &args).unwrap();
    fetch(client, len)
}

fn fit_offline(client: &mut Client, handle: MasterHandle, passes: u32) -> u64 {
    let args = encode(
        client,
        &FitOfflineMasterModelArgs {
            num_collection_passes: passes,
            ..Default::default()
        },
    );
    client.fit_offline_master_model(handle, &args).unwrap()
}

fn batches() -> Vec<messages::data::Batch> {
    (0..4).map(|b| sample_batch(&format!("b{b}"))).collect()
}

#[test]
fn offline_fit_is_independent_of_the_worker_count() {
    let mut config = MasterModelConfig::with_topics(["t0", "t1", "t2"]);
    config.seed = 42;
    config.regularizers.push(RegularizerConfig {
        name: "smooth".into(),
        tau: 0.1,
        kind: RegularizerKind::SmoothSparsePhi {
            topic_names: Vec::new(),
            class_ids: Vec::new(),
            dictionary_name: None,
        },
    });

    let models: Vec<_> = [1, 4]
        .into_iter()
        .map(|workers| {
            let mut client = common::engine(workers).client();
            let handle = create_master(&mut client, &config);
            import(&mut client, handle, batches());
            assert_eq!(fit_offline(&mut client, handle, 3), 4);
            topic_model(&mut client, handle, "pwt")
        })
        .collect();

    assert_eq!(models[0].tokens, models[1].tokens);
    for (a, b) in models[0].weights.iter().flatten().zip(models[1].weights.iter().flatten()) {
        assert!((a - b).abs() < 1e-6);
    }
    assert_sums_to_one((0..3).map(|t| models[0].weights.iter().map(|row| row[t] as f64).sum()));
}

#[test]
fn clearing_theta_of_one_model_keeps_the_others() {
    let mut client = common::client();
    let handle = create_master(&mut client, &MasterModelConfig::with_topics(["t0", "t1"]));
    import(&mut client, handle, batches());
    fit_offline(&mut client, handle, 1);

    let pwt = topic_model(&mut client, handle, "pwt");
    let alt = encode(&client, &pwt);
    client.overwrite_topic_model_named(handle, "alt", &alt).unwrap();

    for model in ["pwt", "alt"] {
        let args = encode(
            &client,
            &ProcessBatchesArgs {
                batch_names: vec!["b0".into()],
                pwt_source_name: Some(model.into()),
                return_theta: false,
                ..Default::default()
            },
        );
        client.request_process_batches(handle, &args).unwrap();
    }

    let args = encode(
        &client,
        &ClearThetaCacheArgs {
            model_name: Some("pwt".into()),
            ..Default::default()
        },
    );
    client.clear_theta_cache(handle, &args).unwrap();

    let request = |model: &str| GetThetaMatrixArgs {
        model_name: Some(model.into()),
        batch_names: vec!["b0".into()],
        ..Default::default()
    };
    let args = encode(&client, &request("pwt"));
    let err = client.request_theta_matrix(handle, &args).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let args = encode(&client, &request("alt"));
    let len = client.request_theta_matrix(handle, &args).unwrap();
    let theta: ThetaMatrix = fetch(&mut client, len);
    assert_eq!(theta.len(), 3);
    assert_eq!(theta.model_name, "alt");
}

#[test]
fn failed_regularizers_roll_back_the_pass() {
    let mut config = MasterModelConfig::with_topics(["t0", "t1"]);
    config.regularizers.push(RegularizerConfig {
        name: "needs_dictionary".into(),
        tau: 1.,
        kind: RegularizerKind::SmoothSparsePhi {
            topic_names: Vec::new(),
            class_ids: Vec::new(),
            dictionary_name: Some("absent".into()),
        },
    });

    let mut client = common::client();
    let handle = create_master(&mut client, &config);
    import(&mut client, handle, batches());

    let before = fit_offline_err(&mut client, handle);
    assert_eq!(before, ErrorKind::RegularizationFailed);
    assert!(client.last_error_message().contains("needs_dictionary"));

    let pwt = topic_model(&mut client, handle, "pwt");
    assert_eq!(pwt.version, 1);

    client
        .dispose_regularizer(handle, "needs_dictionary")
        .unwrap();
    assert_eq!(fit_offline(&mut client, handle, 1), 2);
}

fn fit_offline_err(client: &mut Client, handle: MasterHandle) -> ErrorKind {
    let args = encode(client, &FitOfflineMasterModelArgs::default());
    client.fit_offline_master_model(handle, &args).unwrap_err().kind()
}

#[test]
fn online_fit_publishes_a_version_per_update() {
    let mut client = common::client();
    let handle = create_master(&mut client, &MasterModelConfig::with_topics(["t0", "t1"]));
    import(&mut client, handle, batches());

    let args = encode(
        &client,
        &FitOnlineMasterModelArgs {
            update_after: vec![1, 3, 4],
            apply_weight: vec![1., 0.5, 0.5],
            decay_weight: vec![0., 0.5, 0.5],
            ..Default::default()
        },
    );
    assert_eq!(client.fit_online_master_model(handle, &args).unwrap(), None);

    let pwt = topic_model(&mut client, handle, "pwt");
    assert_eq!(pwt.version, 4);
    assert_sums_to_one((0..2).map(|t| pwt.weights.iter().map(|row| row[t] as f64).sum()));

    let nwt = topic_model(&mut client, handle, "nwt");
    assert_eq!(nwt.version, 3);
}

#[test]
fn scores_are_cached_per_version() {
    let mut config = MasterModelConfig::with_topics(["t0", "t1"]);
    config.scores = vec![
        ScoreConfig {
            name: "perplexity".into(),
            kind: ScoreKind::Perplexity {
                class_ids: Vec::new(),
            },
        },
        ScoreConfig {
            name: "items".into(),
            kind: ScoreKind::ItemsProcessed,
        },
        ScoreConfig {
            name: "sparsity".into(),
            kind: ScoreKind::SparsityPhi {
                class_ids: Vec::new(),
                eps: 1e-37,
            },
        },
    ];

    let mut client = common::client();
    let handle = create_master(&mut client, &config);
    import(&mut client, handle, batches());
    fit_offline(&mut client, handle, 3);

    let args = encode(
        &client,
        &GetScoreArrayArgs {
            score_name: "perplexity".into(),
            model_name: None,
        },
    );
    let len = client.request_score_array(handle, &args).unwrap();
    let array: ScoreArray = fetch(&mut client, len);

    let versions: Vec<_> = array.values.iter().map(|v| v.version).collect();
    assert_eq!(versions, [1, 2, 3]);
    assert!(array.values.iter().all(|v| v.data.scalar().is_some_and(f64::is_finite)));

    let args = encode(
        &client,
        &GetScoreValueArgs {
            score_name: "items".into(),
            version: Some(3),
            ..Default::default()
        },
    );
    let len = client.request_score(handle, &args).unwrap();
    let items: ScoreValue = fetch(&mut client, len);
    assert_eq!(items.data.scalar(), Some(12.));

    let args = encode(
        &client,
        &GetScoreValueArgs {
            score_name: "items".into(),
            batch_name: Some("b2".into()),
            version: Some(2),
            ..Default::default()
        },
    );
    let len = client.request_score(handle, &args).unwrap();
    let batch: ScoreValue = fetch(&mut client, len);
    assert_eq!(batch.batch_id.as_deref(), Some("b2"));
    assert!(matches!(batch.data, ScoreData::ItemsProcessed { value: 3, .. }));

    let args = encode(
        &client,
        &GetScoreValueArgs {
            score_name: "sparsity".into(),
            ..Default::default()
        },
    );
    let len = client.request_score(handle, &args).unwrap();
    let sparsity: ScoreValue = fetch(&mut client, len);
    assert!(sparsity.data.scalar().is_some_and(|s| (0. ..=1.).contains(&s)));

    let args = encode(
        &client,
        &GetScoreValueArgs {
            score_name: "perplexity".into(),
            version: Some(99),
            ..Default::default()
        },
    );
    let err = client.request_score(handle, &args).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}
