//! TF-IDF vectorization of document sets.
//!
//! The vocabulary is fit fresh from exactly the documents supplied in each
//! call; nothing is cached across requests. Tokenization runs per document
//! in parallel via rayon, the document-frequency pass and weighting are
//! single-threaded (corpora here are request-sized, not web-scale).

use std::collections::HashMap;

use rayon::prelude::*;

use crate::model::Document;

/// Common English words removed before weighting.
const ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any", "are",
    "as", "at", "be", "because", "been", "before", "being", "below", "between", "both", "but",
    "by", "can", "could", "did", "do", "does", "doing", "down", "during", "each", "few", "for",
    "from", "further", "had", "has", "have", "having", "he", "her", "here", "hers", "herself",
    "him", "himself", "his", "how", "if", "in", "into", "is", "it", "its", "itself", "just",
    "may", "me", "might", "more", "most", "must", "my", "myself", "no", "nor", "not", "now",
    "of", "off", "on", "once", "only", "or", "other", "our", "ours", "ourselves", "out", "over",
    "own", "same", "shall", "she", "should", "so", "some", "such", "than", "that", "the",
    "their", "theirs", "them", "themselves", "then", "there", "these", "they", "this", "those",
    "through", "to", "too", "under", "until", "up", "upon", "very", "was", "we", "were", "what",
    "when", "where", "which", "while", "who", "whom", "whose", "why", "will", "with", "would",
    "you", "your", "yours", "yourself", "yourselves",
];

/// A term-weighted sparse document vector.
///
/// Entries are `(vocabulary index, weight)` sorted by index, L2-normalized
/// so that the dot product of two vectors is their cosine similarity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TermVector {
    entries: Vec<(usize, f32)>,
}

impl TermVector {
    /// Dot product with another vector (merge over sorted indices).
    pub fn dot(&self, other: &TermVector) -> f32 {
        let (mut i, mut j) = (0, 0);
        let mut sum = 0.0;
        while i < self.entries.len() && j < other.entries.len() {
            let (ti, wi) = self.entries[i];
            let (tj, wj) = other.entries[j];
            match ti.cmp(&tj) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    sum += wi * wj;
                    i += 1;
                    j += 1;
                }
            }
        }
        sum
    }

    /// Number of non-zero terms.
    pub fn nnz(&self) -> usize {
        self.entries.len()
    }

    /// Whether the vector has no non-zero terms.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Lowercase and split into alphanumeric tokens of length >= 2, with stop
/// words removed.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() >= 2)
        .filter(|t| !ENGLISH_STOP_WORDS.contains(t))
        .map(str::to_string)
        .collect()
}

/// TF-IDF vectorizer fit fresh per call.
#[derive(Debug, Clone, Copy, Default)]
pub struct Vectorizer;

impl Vectorizer {
    /// Vectorize an ordered document set, one vector per document.
    ///
    /// By convention document 0 is the profile document and the rest are
    /// candidates. A list with no candidates (length < 2) yields an empty
    /// result: there is nothing to rank against.
    ///
    /// Weights use smoothed inverse document frequency,
    /// `ln((1 + n) / (1 + df)) + 1`, so a term appearing in every document of
    /// a one-document corpus still gets a finite positive weight. Each vector
    /// is L2-normalized.
    pub fn fit_transform(&self, docs: &[Document]) -> Vec<TermVector> {
        if docs.len() < 2 {
            return Vec::new();
        }

        let tokenized: Vec<Vec<String>> = docs
            .par_iter()
            .map(|doc| tokenize(&doc.text))
            .collect();

        // Vocabulary and per-term document frequency over this corpus only.
        let mut vocab: HashMap<&str, usize> = HashMap::new();
        let mut doc_freq: Vec<usize> = Vec::new();
        for tokens in &tokenized {
            let mut seen: Vec<usize> = Vec::new();
            for token in tokens {
                let next_index = vocab.len();
                let index = *vocab.entry(token.as_str()).or_insert_with(|| {
                    doc_freq.push(0);
                    next_index
                });
                if !seen.contains(&index) {
                    doc_freq[index] += 1;
                    seen.push(index);
                }
            }
        }

        let n_docs = docs.len() as f32;
        let idf: Vec<f32> = doc_freq
            .iter()
            .map(|&df| ((1.0 + n_docs) / (1.0 + df as f32)).ln() + 1.0)
            .collect();

        tokenized
            .iter()
            .map(|tokens| {
                let mut counts: HashMap<usize, f32> = HashMap::new();
                for token in tokens {
                    if let Some(&index) = vocab.get(token.as_str()) {
                        *counts.entry(index).or_insert(0.0) += 1.0;
                    }
                }

                let mut entries: Vec<(usize, f32)> = counts
                    .into_iter()
                    .map(|(index, tf)| (index, tf * idf[index]))
                    .collect();
                entries.sort_unstable_by_key(|(index, _)| *index);

                // L2 normalization; an all-stop-word document stays zero.
                let norm = entries.iter().map(|(_, w)| w * w).sum::<f32>().sqrt();
                if norm > 0.0 {
                    for (_, w) in &mut entries {
                        *w /= norm;
                    }
                }

                TermVector { entries }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: u64, text: &str) -> Document {
        Document {
            id,
            text: text.into(),
        }
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let vectors = Vectorizer.fit_transform(&[]);
        assert!(vectors.is_empty());
    }

    #[test]
    fn profile_only_yields_empty_output() {
        let vectors = Vectorizer.fit_transform(&[doc(0, "space opera adventure")]);
        assert!(vectors.is_empty());
    }

    #[test]
    fn one_vector_per_document() {
        let docs = [
            doc(0, "space opera adventure"),
            doc(1, "space opera adventure"),
            doc(2, "cooking recipes"),
        ];
        let vectors = Vectorizer.fit_transform(&docs);
        assert_eq!(vectors.len(), 3);
    }

    #[test]
    fn vectors_are_l2_normalized() {
        let docs = [doc(0, "galaxy empire war"), doc(1, "galaxy cooking")];
        for v in Vectorizer.fit_transform(&docs) {
            let norm_sq = v.dot(&v);
            assert!((norm_sq - 1.0).abs() < 1e-5, "norm^2 was {norm_sq}");
        }
    }

    #[test]
    fn identical_documents_have_unit_similarity() {
        let docs = [doc(0, "space opera adventure"), doc(1, "space opera adventure")];
        let vectors = Vectorizer.fit_transform(&docs);
        let sim = vectors[0].dot(&vectors[1]);
        assert!((sim - 1.0).abs() < 1e-5, "similarity was {sim}");
    }

    #[test]
    fn disjoint_documents_have_zero_similarity() {
        let docs = [doc(0, "galaxy empire"), doc(1, "pasta risotto")];
        let vectors = Vectorizer.fit_transform(&docs);
        assert_eq!(vectors[0].dot(&vectors[1]), 0.0);
    }

    #[test]
    fn single_occurrence_terms_get_finite_weight() {
        // Every term appears in exactly one document; idf must not blow up.
        let docs = [doc(0, "unique alpha"), doc(1, "unique beta")];
        let vectors = Vectorizer.fit_transform(&docs);
        for v in &vectors {
            assert!(!v.is_empty());
            for &(_, w) in &v.entries {
                assert!(w.is_finite());
            }
        }
    }

    #[test]
    fn stop_words_are_removed() {
        let tokens = tokenize("The ship and the ocean");
        assert_eq!(tokens, vec!["ship", "ocean"]);
    }

    #[test]
    fn tokenize_drops_single_letters_and_punctuation() {
        let tokens = tokenize("I, a 7 x-ray!");
        assert_eq!(tokens, vec!["ray"]);
    }

    #[test]
    fn all_stop_word_document_becomes_zero_vector() {
        let docs = [doc(0, "the and of"), doc(1, "galaxy empire")];
        let vectors = Vectorizer.fit_transform(&docs);
        assert!(vectors[0].is_empty());
        assert_eq!(vectors[0].dot(&vectors[1]), 0.0);
    }
}
