use std::collections::BTreeSet;

use tabula_text_index::{PostingsFile, SearchOptions, index_text, search::search};
use tempfile::TempDir;

const WORDS: [&str; 8] = ["quick", "brown", "fox", "lazy", "dog", "jumps", "over", "the"];

fn open_fresh(dir: &TempDir) -> PostingsFile {
    PostingsFile::create(
        &dir.path().join("occurrences.postings"),
        &dir.path().join("wordidx.words"),
    )
    .unwrap()
}

#[test]
fn test_phrase_position_after_reopen() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let mut postings = open_fresh(&dir);
    for row in 0..7 {
        index_text(&mut postings, row, "nothing to see here").unwrap();
    }
    index_text(&mut postings, 7, "the quick brown fox").unwrap();
    postings.flush().unwrap();
    drop(postings);

    let reader = PostingsFile::open(
        &dir.path().join("occurrences.postings"),
        &dir.path().join("wordidx.words"),
    )
    .unwrap();
    assert_eq!(reader.get_occurrences("QUICK").unwrap(), vec![(7, 1)]);

    let hits = search(&reader, "\"quick brown\"", &SearchOptions::default()).unwrap();
    assert_eq!(hits.row_ids(), vec![7]);
    let hits = search(&reader, "quick -see", &SearchOptions::default()).unwrap();
    assert_eq!(hits.row_ids(), vec![7]);
}

#[test]
fn test_search_matches_scan() {
    let mut rng = fastrand::Rng::with_seed(7);
    let dir = TempDir::new().expect("Failed to create temp directory");
    let mut postings = open_fresh(&dir);
    let docs: Vec<Vec<&str>> = (0..400)
        .map(|_| (0..rng.usize(1..12)).map(|_| WORDS[rng.usize(..WORDS.len())]).collect())
        .collect();
    for (row, doc) in docs.iter().enumerate() {
        index_text(&mut postings, row as u32, &doc.join(" ")).unwrap();
    }
    postings.flush().unwrap();

    let options = SearchOptions::default();
    let has = |doc: &Vec<&str>, w: &str| doc.contains(&w);

    let expected: BTreeSet<u32> = docs
        .iter()
        .enumerate()
        .filter(|(_, d)| has(d, "fox") && !has(d, "dog"))
        .map(|(i, _)| i as u32)
        .collect();
    let hits = search(&postings, "fox &- dog", &options).unwrap();
    assert_eq!(hits.row_ids().into_iter().collect::<BTreeSet<_>>(), expected);

    let expected: BTreeSet<u32> = docs
        .iter()
        .enumerate()
        .filter(|(_, d)| d.windows(2).any(|w| w == ["lazy", "dog"]))
        .map(|(i, _)| i as u32)
        .collect();
    let hits = search(&postings, "\"lazy dog\"", &options).unwrap();
    assert_eq!(hits.row_ids().into_iter().collect::<BTreeSet<_>>(), expected);

    let expected: BTreeSet<u32> = docs
        .iter()
        .enumerate()
        .filter(|(_, d)| has(d, "quick") || has(d, "over"))
        .map(|(i, _)| i as u32)
        .collect();
    let hits = search(&postings, "qu* | ov*", &options).unwrap();
    assert_eq!(hits.row_ids().into_iter().collect::<BTreeSet<_>>(), expected);
}
