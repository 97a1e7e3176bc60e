//! Reference values for the built-in text heuristics.

use evalkit_core::heuristics::{self, bleu_score, levenshtein_similarity, rouge_l};
use evalkit_core::{Engine, EvalContext, EvalInput, HeuristicKind};

#[test]
fn test_levenshtein_reference_values() {
    assert_eq!(levenshtein_similarity("", "", true), 1.0);
    let kitten = levenshtein_similarity("kitten", "sitting", true);
    assert!((kitten - (1.0 - 3.0 / 7.0)).abs() < 1e-9);
}

#[test]
fn test_rouge_l_reference_values() {
    let score = rouge_l(&["the", "cat"], &["the", "cat", "sat"], 1.0);
    assert_eq!(score.lcs, 2);
    assert!((score.precision - 1.0).abs() < 1e-9);
    assert!((score.recall - 2.0 / 3.0).abs() < 1e-9);
    assert!((score.f_measure - 0.8).abs() < 1e-9);
}

#[test]
fn test_bleu_identical_sentences() {
    let tokens = ["the", "quick", "brown", "fox", "jumps"];
    let score = bleu_score(&tokens, &tokens, 4);
    assert!((score - 1.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_every_heuristic_scores_in_unit_range() {
    let metrics = HeuristicKind::ALL
        .iter()
        .map(|kind| heuristics::build(*kind))
        .collect();
    let engine = Engine::new(metrics);

    let input = EvalInput::new("What is the capital of France?", "Paris is the capital")
        .with_expected("The capital is Paris");
    let result = engine
        .evaluate_one(&EvalContext::background(), input)
        .await;

    assert_eq!(result.scores.len(), HeuristicKind::ALL.len());
    for score in result.scores.iter() {
        assert!(score.is_success(), "{} failed", score.name);
        assert!(
            (0.0..=1.0).contains(&score.value),
            "{} out of range: {}",
            score.name,
            score.value
        );
    }
    assert_eq!(result.score("contains").unwrap().value, 0.0);
}

#[test]
fn test_heuristic_names_parse_back() {
    for kind in HeuristicKind::ALL {
        let parsed: HeuristicKind = kind.as_str().parse().unwrap();
        assert_eq!(parsed, kind);
    }
    assert!("rouge-l".parse::<HeuristicKind>().is_ok());
    assert!("perplexity".parse::<HeuristicKind>().is_err());
}
