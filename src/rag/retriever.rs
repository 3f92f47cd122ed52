use super::error::PipelineError;
use super::store::Passage;

pub fn dot_product(query: &[f32], candidate: &[f32]) -> Result<f32, PipelineError> {
    if query.len() != candidate.len() {
        return Err(PipelineError::DimensionMismatch {
            expected: candidate.len(),
            actual: query.len(),
        });
    }
    Ok(query.iter().zip(candidate).map(|(a, b)| a * b).sum())
}

/// A retrieved passage and its similarity to the query.
#[derive(Debug, Clone, Copy)]
pub struct RetrievedPassage<'a> {
    pub index: usize,
    pub score: f32,
    pub passage: &'a Passage,
}

/// Return the passage with the highest dot product against `query_embedding`.
///
/// Ties resolve to the earliest passage in store order. A NaN score never
/// beats a number.
pub fn retrieve_best<'a>(
    passages: &'a [Passage],
    query_embedding: &[f32],
) -> Result<RetrievedPassage<'a>, PipelineError> {
    let mut best: Option<RetrievedPassage<'a>> = None;

    for (index, passage) in passages.iter().enumerate() {
        let score = dot_product(query_embedding, &passage.embedding)?;
        let better = match &best {
            None => true,
            Some(current) => score > current.score || (current.score.is_nan() && !score.is_nan()),
        };
        if better {
            best = Some(RetrievedPassage {
                index,
                score,
                passage,
            });
        }
    }

    best.ok_or(PipelineError::EmptyStore)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passages(embeddings: Vec<Vec<f32>>) -> Vec<Passage> {
        embeddings
            .into_iter()
            .enumerate()
            .map(|(i, e)| Passage::new(format!("passage {i}"), e, "doc.txt", i))
            .collect()
    }

    #[test]
    fn empty_store_is_an_error() {
        let err = retrieve_best(&[], &[1.0, 0.0]).expect_err("must fail");
        assert!(matches!(err, PipelineError::EmptyStore));
    }

    #[test]
    fn picks_the_passage_matching_the_query() {
        let store = passages(vec![
            vec![1.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.0, 0.0, 1.0],
        ]);
        for k in 0..store.len() {
            let query = store[k].embedding.clone();
            let best = retrieve_best(&store, &query).expect("retrieval");
            assert_eq!(best.index, k);
            assert_eq!(best.passage.text, format!("passage {k}"));
        }
    }

    #[test]
    fn uses_raw_dot_product_not_cosine() {
        // Cosine would prefer the first vector; the dot product prefers the longer one.
        let store = passages(vec![vec![1.0, 0.0], vec![3.0, 3.0]]);
        let best = retrieve_best(&store, &[1.0, 0.0]).expect("retrieval");
        assert_eq!(best.index, 1);
        assert!((best.score - 3.0).abs() < f32::EPSILON);
    }

    #[test]
    fn ties_resolve_to_the_earliest_passage() {
        let store = passages(vec![
            vec![0.0, 1.0],
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 0.0],
        ]);
        let best = retrieve_best(&store, &[1.0, 0.0]).expect("retrieval");
        assert_eq!(best.index, 1);
    }

    #[test]
    fn nan_scores_do_not_win() {
        let store = passages(vec![vec![f32::NAN, 0.0], vec![0.5, 0.0]]);
        let best = retrieve_best(&store, &[1.0, 0.0]).expect("retrieval");
        assert_eq!(best.index, 1);
    }

    #[test]
    fn dimension_mismatch_is_reported() {
        let store = passages(vec![vec![1.0, 0.0]]);
        let err = retrieve_best(&store, &[1.0, 0.0, 0.0]).expect_err("must fail");
        assert!(matches!(
            err,
            PipelineError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));
    }
}
