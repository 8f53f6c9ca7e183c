use std::{
    collections::HashMap,
    fs::File,
    io::{BufRead, BufReader},
};

use log::info;
use messages::{
    DEFAULT_CLASS,
    args::CollectionParserConfig,
    data::{Batch, Item},
};

use crate::{
    error::{EngineErr, Result},
    storage::save_batch,
};

/// Accumulates the documents of the batch being built.
#[derive(Default)]
struct BatchBuilder {
    tokens: Vec<String>,
    class_ids: Vec<String>,
    index: HashMap<(String, String), u32>,
    items: Vec<Item>,
}

impl BatchBuilder {
    fn token_id(&mut self, class_id: &str, keyword: &str) -> u32 {
        let key = (class_id.to_string(), keyword.to_string());
        if let Some(&id) = self.index.get(&key) {
            return id;
        }

        let id = self.tokens.len() as u32;
        self.tokens.push(keyword.to_string());
        self.class_ids.push(class_id.to_string());
        self.index.insert(key, id);
        id
    }

    fn build(&mut self, id: String) -> Batch {
        let builder = std::mem::take(self);
        Batch {
            id,
            tokens: builder.tokens,
            class_ids: builder.class_ids,
            items: builder.items,
        }
    }
}

/// Parses one line into an item of `builder`.
///
/// A line reads `title token[:count] ... |class token[:count] ...`, tokens before
/// the first class marker belong to the default class.
fn parse_line(builder: &mut BatchBuilder, item_id: u64, line: &str, line_no: usize) -> Result<()> {
    let mut words = line.split_whitespace();
    let Some(title) = words.next() else {
        return Ok(());
    };

    let mut class_id = DEFAULT_CLASS.to_string();
    let mut weights: HashMap<u32, f32> = HashMap::new();
    let mut order = Vec::new();

    for word in words {
        if let Some(class) = word.strip_prefix('|') {
            class_id = if class.is_empty() {
                DEFAULT_CLASS.to_string()
            } else {
                class.to_string()
            };
            continue;
        }

        let (keyword, count) = match word.rsplit_once(':') {
            Some((keyword, count)) if !keyword.is_empty() => {
                let count: f32 = count.parse().map_err(|_| {
                    EngineErr::invalid(format!("line {line_no}: invalid token count in {word}"))
                })?;
                (keyword, count)
            }
            _ => (word, 1.),
        };

        if !count.is_finite() || count < 0. {
            return Err(EngineErr::invalid(format!(
                "line {line_no}: token counts must be finite and non negative, got {word}"
            )));
        }

        let id = builder.token_id(&class_id, keyword);
        let weight = weights.entry(id).or_insert_with(|| {
            order.push(id);
            0.
        });
        *weight += count;
    }

    builder.items.push(Item {
        id: item_id,
        title: Some(title.to_string()),
        token_weights: order.iter().map(|id| weights[id]).collect(),
        token_ids: order,
    });
    Ok(())
}

fn flush(
    config: &CollectionParserConfig,
    builder: &mut BatchBuilder,
    num_batches: &mut usize,
) -> Result<()> {
    let batch = builder.build(format!("{}_{:06}", config.batch_name_prefix, num_batches));
    save_batch(&config.target_folder, &batch)?;
    *num_batches += 1;
    Ok(())
}

/// Converts a text collection into batch files.
///
/// Every non empty line becomes a document, numbered from zero in collection
/// order. Batches are written to the target folder as `<prefix>_<n>`.
///
/// # Returns
/// The amount of written batches, or an `InvalidConfig` error on malformed lines.
pub fn parse_collection(config: &CollectionParserConfig) -> Result<usize> {
    if config.num_items_per_batch == 0 {
        return Err(EngineErr::invalid("num_items_per_batch must be positive"));
    }

    let file =
        File::open(&config.source_path).map_err(|e| EngineErr::disk(&config.source_path, e))?;
    let reader = BufReader::new(file);

    let mut builder = BatchBuilder::default();
    let mut num_items = 0u64;
    let mut num_batches = 0;

    for (i, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| EngineErr::disk(&config.source_path, e))?;
        if line.trim().is_empty() {
            continue;
        }

        parse_line(&mut builder, num_items, &line, i + 1)?;
        num_items += 1;

        if builder.items.len() == config.num_items_per_batch {
            flush(config, &mut builder, &mut num_batches)?;
        }
    }

    if !builder.items.is_empty() {
        flush(config, &mut builder, &mut num_batches)?;
    }

    info!(
        "parsed {num_items} documents of {} into {num_batches} batches",
        config.source_path.display()
    );
    Ok(num_batches)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;
    use crate::storage::BatchStore;

    #[test]
    fn parses_classes_and_counts() {
        let mut builder = BatchBuilder::default();
        parse_line(&mut builder, 0, "doc1 cat:2 dog cat |author alice", 1).unwrap();
        let batch = builder.build("b".into());

        assert_eq!(batch.tokens, ["cat", "dog", "alice"]);
        assert_eq!(batch.class_ids, [DEFAULT_CLASS, DEFAULT_CLASS, "author"]);

        let item = &batch.items[0];
        assert_eq!(item.title.as_deref(), Some("doc1"));
        assert_eq!(item.token_ids, [0, 1, 2]);
        assert_eq!(item.token_weights, [3., 1., 1.]);
    }

    #[test]
    fn rejects_bad_counts() {
        let mut builder = BatchBuilder::default();
        let err = parse_line(&mut builder, 0, "doc cat:many", 7).unwrap_err();

        assert_eq!(err.kind(), crate::ErrorKind::InvalidConfig);
        assert!(err.to_string().contains("line 7"));
    }

    #[test]
    fn splits_the_collection_into_batches() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("collection.vw");
        fs::write(&source, "d0 a b\n\nd1 b c\nd2 c:3\n").unwrap();

        let config = CollectionParserConfig {
            source_path: source,
            target_folder: dir.path().join("batches"),
            num_items_per_batch: 2,
            batch_name_prefix: "part".into(),
        };
        assert_eq!(parse_collection(&config).unwrap(), 2);

        let batches = BatchStore::load_folder(&config.target_folder).unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].id, "part_000000");
        assert_eq!(batches[0].items.len(), 2);
        assert_eq!(batches[1].items[0].id, 2);
    }
}
