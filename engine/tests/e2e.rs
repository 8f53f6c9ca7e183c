mod common;

use common::{assert_sums_to_one, create_master, encode, fetch, import, sample_batch};
use messages::{
    args::{
        FitOfflineMasterModelArgs, GetThetaMatrixArgs, GetTopicModelArgs, ProcessBatchesArgs,
    },
    data::{ThetaMatrix, TopicModelData},
    specs::MasterModelConfig,
};

#[test]
fn offline_fit_yields_normalized_theta_and_phi() {
    let mut client = common::client();
    let handle = create_master(&mut client, &MasterModelConfig::with_topics(["t0", "t1"]));
    import(&mut client, handle, vec![sample_batch("b0")]);

    let args = encode(
        &client,
        &FitOfflineMasterModelArgs {
            num_collection_passes: 1,
            ..Default::default()
        },
    );
    let version = client.fit_offline_master_model(handle, &args).unwrap();
    assert_eq!(version, 2);

    let args = encode(&client, &GetThetaMatrixArgs::default());
    let len = client.request_theta_matrix(handle, &args).unwrap();
    let mut buf = vec![0; len];
    client.copy_requested_message(&mut buf).unwrap();
    let theta: ThetaMatrix = client.engine().format().decode(&buf).unwrap();

    assert_eq!(theta.len(), 3);
    assert_eq!(theta.topic_names, ["t0", "t1"]);
    assert_sums_to_one(
        theta
            .item_weights
            .iter()
            .map(|row| row.iter().map(|&v| v as f64).sum()),
    );

    let args = encode(&client, &GetTopicModelArgs::default());
    let len = client.request_topic_model(handle, &args).unwrap();
    let phi: TopicModelData = fetch(&mut client, len);

    assert_eq!(phi.version, version);
    assert_eq!(phi.tokens.len(), 4);
    assert_sums_to_one((0..2).map(|t| phi.weights.iter().map(|row| row[t] as f64).sum()));
}

#[test]
fn processing_returns_theta_without_touching_the_model() {
    let mut client = common::client();
    let handle = create_master(&mut client, &MasterModelConfig::with_topics(["t0", "t1", "t2"]));
    import(&mut client, handle, vec![sample_batch("b0"), sample_batch("b1")]);

    let fit = encode(&client, &FitOfflineMasterModelArgs::default());
    let version = client.fit_offline_master_model(handle, &fit).unwrap();

    let args = encode(
        &client,
        &ProcessBatchesArgs {
            batch_names: vec!["b1".into()],
            ..Default::default()
        },
    );
    let len = client.request_process_batches(handle, &args).unwrap();
    let theta: ThetaMatrix = fetch(&mut client, len);

    assert_eq!(theta.version, version);
    assert_eq!(theta.batch_ids, ["b1", "b1", "b1"]);
    assert_sums_to_one(
        theta
            .item_weights
            .iter()
            .map(|row| row.iter().map(|&v| v as f64).sum()),
    );

    let args = encode(&client, &GetTopicModelArgs::default());
    let len = client.request_topic_model(handle, &args).unwrap();
    let phi: TopicModelData = fetch(&mut client, len);
    assert_eq!(phi.version, version);
}
