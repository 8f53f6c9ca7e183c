use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use messages::{
    args::FilterDictionaryArgs,
    data::{Batch, DictionaryData, DictionaryEntry, Token},
};

use crate::{
    error::{EngineErr, Result},
    processing::WorkerPool,
};

/// The thresholds applied by `Dictionary::filter`, every bound is inclusive.
pub type FilterOptions = FilterDictionaryArgs;

/// The partial counters of a single batch.
#[derive(Default)]
struct Counters {
    tf: HashMap<Token, f64>,
    df: HashMap<Token, u64>,
    num_items: u64,
}

impl Counters {
    fn of_batch(batch: &Batch) -> Self {
        let mut counters = Self::default();
        let mut seen = HashSet::new();

        for item in &batch.items {
            counters.num_items += 1;
            seen.clear();

            for (&id, &weight) in item.token_ids.iter().zip(&item.token_weights) {
                let Some(token) = batch.token(id as usize) else {
                    continue;
                };

                if !weight.is_finite() || weight < 0. {
                    continue;
                }

                *counters.tf.entry(token.clone()).or_default() += weight as f64;
                if seen.insert(token.clone()) {
                    *counters.df.entry(token).or_default() += 1;
                }
            }
        }

        counters
    }

    fn merge(mut self, other: Self) -> Self {
        for (token, tf) in other.tf {
            *self.tf.entry(token).or_default() += tf;
        }
        for (token, df) in other.df {
            *self.df.entry(token).or_default() += df;
        }
        self.num_items += other.num_items;
        self
    }
}

/// Immutable aggregate statistics of the tokens of a collection, sorted by token.
#[derive(Debug, Clone, PartialEq)]
pub struct Dictionary {
    name: String,
    entries: Vec<DictionaryEntry>,
    index: HashMap<Token, usize>,
    num_items: u64,
}

impl Dictionary {
    /// Builds a dictionary out of its transferable form.
    ///
    /// # Returns
    /// The dictionary or an `InvalidConfig` error on repeated tokens or
    /// negative statistics.
    pub fn from_data(data: DictionaryData) -> Result<Self> {
        if data.name.is_empty() {
            return Err(EngineErr::invalid("a dictionary needs a non empty name"));
        }

        let mut entries = data.entries;
        entries.sort_by(|a, b| a.token.cmp(&b.token));

        let mut index = HashMap::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            if [entry.value, entry.tf, entry.df]
                .iter()
                .any(|v| !v.is_finite() || *v < 0.)
            {
                return Err(EngineErr::invalid(format!(
                    "token {} of dictionary {} has invalid statistics",
                    entry.token.keyword, data.name
                )));
            }

            if index.insert(entry.token.clone(), i).is_some() {
                return Err(EngineErr::invalid(format!(
                    "repeated token {} in dictionary {}",
                    entry.token.keyword, data.name
                )));
            }
        }

        Ok(Self {
            name: data.name,
            entries,
            index,
            num_items: data.num_items,
        })
    }

    pub fn to_data(&self) -> DictionaryData {
        DictionaryData {
            name: self.name.clone(),
            entries: self.entries.clone(),
            num_items: self.num_items,
        }
    }

    /// Gathers the statistics of every token of `batches`.
    ///
    /// Each batch is counted independently on the worker pool and the partial
    /// counters are then summed in batch id order, so the result doesn't depend
    /// on the order the batches are given in.
    ///
    /// # Arguments
    /// * `name` - The name of the new dictionary.
    /// * `batches` - The batches to scan.
    /// * `pool` - The worker pool running the per batch scans.
    pub fn gather(
        name: impl Into<String>,
        batches: &[Arc<Batch>],
        pool: &WorkerPool,
    ) -> Result<Self> {
        let mut batches = batches.to_vec();
        batches.sort_by(|a, b| a.id.cmp(&b.id));
        batches.dedup_by(|a, b| a.id == b.id);

        let partials = pool.map(&batches, |batch| Counters::of_batch(batch));
        let counters = partials
            .into_iter()
            .fold(Counters::default(), Counters::merge);

        let mut entries: Vec<_> = counters
            .tf
            .into_iter()
            .map(|(token, tf)| DictionaryEntry {
                value: 0.,
                df: counters.df.get(&token).copied().unwrap_or_default() as f32,
                tf: tf as f32,
                token,
            })
            .collect();
        entries.sort_by(|a, b| a.token.cmp(&b.token));

        let total_tf: f64 = entries.iter().map(|e| e.tf as f64).sum();
        for entry in &mut entries {
            entry.value = if total_tf > 0. { (entry.tf as f64 / total_tf) as f32 } else { 0. };
        }

        Self::from_data(DictionaryData {
            name: name.into(),
            entries,
            num_items: counters.num_items,
        })
    }

    /// Creates a filtered copy of the dictionary, `self` is left untouched.
    ///
    /// Only tokens of `options.class_id` are subject to the thresholds, the rest
    /// are kept as is. The values of the kept tokens are renormalized.
    ///
    /// # Arguments
    /// * `name` - The name of the filtered copy.
    /// * `options` - The thresholds to apply.
    pub fn filter(&self, name: impl Into<String>, options: &FilterOptions) -> Result<Self> {
        let num_items = self.num_items.max(1) as f32;
        let in_scope = |entry: &DictionaryEntry| {
            options
                .class_id
                .as_ref()
                .is_none_or(|class_id| *class_id == entry.token.class_id)
        };

        let passes = |entry: &DictionaryEntry| {
            let rate = entry.df / num_items;
            options.min_df.is_none_or(|min| entry.df >= min)
                && options.max_df.is_none_or(|max| entry.df <= max)
                && options.min_df_rate.is_none_or(|min| rate >= min)
                && options.max_df_rate.is_none_or(|max| rate <= max)
                && options.min_tf.is_none_or(|min| entry.tf >= min)
                && options.max_tf.is_none_or(|max| entry.tf <= max)
        };

        let (mut scoped, kept): (Vec<_>, Vec<_>) = self
            .entries
            .iter()
            .filter(|e| !in_scope(e) || passes(e))
            .cloned()
            .partition(|e| in_scope(e));

        if let Some(size) = options.max_dictionary_size {
            scoped.sort_by(|a, b| b.tf.total_cmp(&a.tf).then_with(|| a.token.cmp(&b.token)));
            scoped.truncate(size);
        }

        let mut entries: Vec<_> = scoped.into_iter().chain(kept).collect();
        let total_tf: f32 = entries.iter().map(|e| e.tf).sum();
        for entry in &mut entries {
            entry.value = if total_tf > 0. { entry.tf / total_tf } else { 0. };
        }

        Self::from_data(DictionaryData {
            name: name.into(),
            entries,
            num_items: self.num_items,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entries(&self) -> &[DictionaryEntry] {
        &self.entries
    }

    pub fn entry(&self, token: &Token) -> Option<&DictionaryEntry> {
        self.index.get(token).map(|&i| &self.entries[i])
    }

    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        self.entries.iter().map(|e| &e.token)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn num_items(&self) -> u64 {
        self.num_items
    }
}

#[cfg(test)]
mod tests {
    use messages::data::Item;

    use super::*;

    fn batch(id: &str, docs: &[&[(&str, f32)]]) -> Arc<Batch> {
        let mut tokens: Vec<String> = Vec::new();
        let items = docs
            .iter()
            .enumerate()
            .map(|(i, doc)| {
                let mut item = Item {
                    id: i as u64,
                    title: None,
                    token_ids: Vec::new(),
                    token_weights: Vec::new(),
                };
                for &(keyword, weight) in doc.iter() {
                    let id = tokens.iter().position(|t| t == keyword).unwrap_or_else(|| {
                        tokens.push(keyword.to_string());
                        tokens.len() - 1
                    });
                    item.token_ids.push(id as u32);
                    item.token_weights.push(weight);
                }
                item
            })
            .collect();

        Arc::new(Batch {
            id: id.to_string(),
            tokens,
            class_ids: Vec::new(),
            items,
        })
    }

    #[test]
    fn gather_counts_tf_and_df() {
        let pool = WorkerPool::new(2).unwrap();
        let batches = [batch("b0", &[&[("a", 2.), ("b", 1.)], &[("a", 1.)]])];
        let dict = Dictionary::gather("d", &batches, &pool).unwrap();

        let a = dict.entry(&Token::keyword("a")).unwrap();
        assert_eq!((a.tf, a.df), (3., 2.));
        assert!((a.value - 0.75).abs() < 1e-6);
        assert_eq!(dict.num_items(), 2);
    }

    #[test]
    fn repeated_vocabulary_entries_count_once_per_document() {
        let pool = WorkerPool::new(2).unwrap();
        let batches = [Arc::new(Batch {
            id: "b0".into(),
            tokens: vec!["a".into(), "a".into()],
            class_ids: Vec::new(),
            items: vec![Item {
                id: 0,
                title: None,
                token_ids: vec![0, 1],
                token_weights: vec![1., 2.],
            }],
        })];
        let dict = Dictionary::gather("d", &batches, &pool).unwrap();

        let a = dict.entry(&Token::keyword("a")).unwrap();
        assert_eq!((a.tf, a.df), (3., 1.));
        assert_eq!(dict.len(), 1);
    }

    #[test]
    fn filter_keeps_the_source_untouched() {
        let pool = WorkerPool::new(2).unwrap();
        let batches = [
            batch("b0", &[&[("a", 1.), ("b", 5.)]]),
            batch("b1", &[&[("a", 1.), ("c", 1.)]]),
        ];
        let dict = Dictionary::gather("d", &batches, &pool).unwrap();

        let options = FilterOptions {
            min_df: Some(2.),
            ..Default::default()
        };
        let filtered = dict.filter("f", &options).unwrap();

        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.entries()[0].value, 1.);
        assert_eq!(dict.len(), 3);
    }

    #[test]
    fn filter_top_k_by_tf() {
        let pool = WorkerPool::new(1).unwrap();
        let batches = [batch("b0", &[&[("a", 1.), ("b", 5.), ("c", 3.)]])];
        let dict = Dictionary::gather("d", &batches, &pool).unwrap();

        let options = FilterOptions {
            max_dictionary_size: Some(2),
            ..Default::default()
        };
        let filtered = dict.filter("f", &options).unwrap();
        let keywords: Vec<_> = filtered.tokens().map(|t| t.keyword.as_str()).collect();

        assert_eq!(keywords, ["b", "c"]);
    }

    #[test]
    fn negative_statistics_are_rejected() {
        let data = DictionaryData {
            name: "d".into(),
            entries: vec![DictionaryEntry {
                token: Token::keyword("a"),
                value: 0.5,
                tf: -1.,
                df: 1.,
            }],
            num_items: 1,
        };

        assert!(Dictionary::from_data(data).is_err());
    }
}
