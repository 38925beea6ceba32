use crate::db::models::SearchResult;

/// Re-sorts by edit distance between each entry's name and `term`.
/// The sort is stable, so equally distant entries keep their prior order.
pub fn rank_by_name(results: &mut [SearchResult], term: &str) {
    if term.is_empty() {
        return;
    }
    results.sort_by_cached_key(|result| edit_distance(result.name(), term));
}

/// Levenshtein distance over chars, case-sensitive.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev_row: Vec<usize> = (0..=b.len()).collect();
    let mut curr_row = vec![0; b.len() + 1];

    for i in 1..=a.len() {
        curr_row[0] = i;
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr_row[j] = (prev_row[j] + 1)
                .min(curr_row[j - 1] + 1)
                .min(prev_row[j - 1] + cost);
        }
        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[b.len()]
}
