#![allow(dead_code)]

use std::sync::Arc;

use engine::{Client, Engine, EngineConfig, MasterHandle};
use messages::{
    data::{Batch, Item},
    specs::MasterModelConfig,
};
use serde::{Serialize, de::DeserializeOwned};

pub fn engine(num_processors: usize) -> Arc<Engine> {
    Arc::new(
        Engine::new(EngineConfig {
            num_processors,
            async_threads: 2,
        })
        .unwrap(),
    )
}

pub fn client() -> Client {
    engine(2).client()
}

pub fn encode<T: Serialize>(client: &Client, value: &T) -> Vec<u8> {
    client.engine().format().encode(value).unwrap()
}

/// Copies the pending result out and decodes it.
pub fn fetch<T: DeserializeOwned>(client: &mut Client, len: usize) -> T {
    let mut buf = vec![0; len];
    client.copy_requested_message(&mut buf).unwrap();
    client.engine().format().decode(&buf).unwrap()
}

/// A batch whose documents are lists of `(token, count)` pairs.
pub fn batch(id: &str, docs: &[&[(&str, f32)]]) -> Batch {
    let mut tokens: Vec<String> = Vec::new();
    let mut items = Vec::new();

    for (d, doc) in docs.iter().enumerate() {
        let mut item = Item {
            id: d as u64,
            title: None,
            token_ids: Vec::new(),
            token_weights: Vec::new(),
        };

        for &(token, count) in doc.iter() {
            let id = match tokens.iter().position(|t| t == token) {
                Some(id) => id,
                None => {
                    tokens.push(token.to_string());
                    tokens.len() - 1
                }
            };
            item.token_ids.push(id as u32);
            item.token_weights.push(count);
        }

        items.push(item);
    }

    Batch {
        id: id.to_string(),
        tokens,
        class_ids: Vec::new(),
        items,
    }
}

pub fn sample_batch(id: &str) -> Batch {
    batch(
        id,
        &[
            &[("apple", 3.), ("banana", 1.)],
            &[("banana", 2.), ("cherry", 4.)],
            &[("apple", 1.), ("cherry", 1.), ("durian", 5.)],
        ],
    )
}

pub fn create_master(client: &mut Client, config: &MasterModelConfig) -> MasterHandle {
    let bytes = encode(client, config);
    client.create_master_model(&bytes).unwrap()
}

pub fn import(client: &mut Client, handle: MasterHandle, batches: Vec<Batch>) {
    let args = encode(client, &messages::args::ImportBatchesArgs { batches });
    client.import_batches(handle, &args).unwrap();
}

pub fn assert_sums_to_one(values: impl IntoIterator<Item = f64>) {
    for sum in values {
        assert!((sum - 1.).abs() < 1e-5, "sum is {sum}");
    }
}
